//! Reportal Core - Domain types and integration trait definitions
//!
//! This crate defines the shared abstractions for the Reportal backend:
//! the company/role model, permission records, folder catalog entries and
//! the traits that wrap the external identity provider and blob store.

pub mod error;
pub mod logging;
pub mod traits;
pub mod types;

pub use error::*;
pub use logging::*;
pub use traits::*;
pub use types::*;

// Re-export commonly used external types
pub use async_trait::async_trait;
pub use tracing;
