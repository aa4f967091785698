//! HTTP request handlers for the report portal

pub mod folders;
pub mod health;
pub mod reports;
pub mod types;

pub use folders::{create_folder, delete_folder, list_folders};
pub use health::health_check;
pub use reports::{download_report, list_reports};
