//! Reportal Web Server
//!
//! This crate exposes the report portal over HTTP: an authentication
//! gateway that resolves bearer tokens against the external identity
//! provider, and role-gated access to report folders in the blob store.

pub mod auth;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod server;
pub mod state;
pub mod storage;

// Re-export main types
pub use server::ReportalServer;
pub use state::AppState;

use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa_swagger_ui::SwaggerUi;

/// Create the main application router
///
/// The authentication gateway runs as a middleware on the API routes so
/// every handler downstream can rely on a resolved `AuthContext` (or its
/// absence, for anonymous requests).
pub fn create_app(state: AppState) -> Router {
    // Configure CORS for the SPA frontend
    let cors = CorsLayer::new()
        .allow_origin("http://localhost:3000".parse::<HeaderValue>().unwrap())
        .allow_origin("http://127.0.0.1:3000".parse::<HeaderValue>().unwrap())
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_credentials(true)
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE]);

    Router::new()
        .nest("/api", routes::api_routes(state.clone()))
        .merge(
            SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", openapi::api_doc()),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Configuration for the web server
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Database URL (optional; memory stores when absent)
    pub database_url: Option<String>,
    /// Identity provider base URL
    pub provider_url: Option<String>,
    /// Identity provider public (anon) API key
    pub provider_key: Option<String>,
    /// Identity provider service-role key for admin operations
    pub provider_service_key: Option<String>,
    /// Blob store bucket holding the report objects
    pub storage_bucket: Option<String>,
    /// Blob store region (falls back to ambient AWS configuration)
    pub storage_region: Option<String>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            database_url: None,
            provider_url: None,
            provider_key: None,
            provider_service_key: None,
            storage_bucket: None,
            storage_region: None,
        }
    }
}

impl WebConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("REPORTAL_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("REPORTAL_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            database_url: std::env::var("DATABASE_URL").ok(),
            provider_url: std::env::var("SUPABASE_URL").ok(),
            provider_key: std::env::var("SUPABASE_KEY").ok(),
            provider_service_key: std::env::var("SUPABASE_SERVICE_ROLE_KEY").ok(),
            storage_bucket: std::env::var("AWS_STORAGE_BUCKET_NAME").ok(),
            storage_region: std::env::var("AWS_S3_REGION_NAME").ok(),
        }
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Error types for the web server
#[derive(thiserror::Error, Debug)]
pub enum WebError {
    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for web operations
pub type WebResult<T> = Result<T, WebError>;

/// Initialize logging for the web server
pub fn init_logging() {
    reportal_core::init_logging("reportal_web=debug,tower_http=debug,axum=debug");
}
