//! Liveness endpoint

use super::types::HealthResponse;
use axum::response::Json;

/// Report the service as up, with its build version
///
/// Deliberately unauthenticated and independent of the identity
/// provider, database and blob store, so probes keep passing while a
/// backend is degraded.
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    summary = "Health check",
    description = "Liveness probe for the report portal backend",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
