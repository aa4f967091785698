//! Route definitions for the report portal

use crate::{auth, handlers, middleware, AppState};
use axum::{
    routing::{delete, get, post, put},
    Router,
};

/// Create API routes with the authentication gateway layered on top
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Reports
        .route("/reports/list", get(handlers::list_reports))
        .route("/reports/download", get(handlers::download_report))
        // User management
        .route("/users", get(auth::handlers::list_users))
        .route("/users", post(auth::handlers::create_user))
        .route("/users/me/permissions", get(auth::handlers::current_user_permissions))
        .route("/users/{user_id}", get(auth::handlers::get_user))
        .route("/users/{user_id}", put(auth::handlers::update_user))
        .route("/users/{user_id}", delete(auth::handlers::delete_user))
        // Folder catalog
        .route("/folders", get(handlers::list_folders))
        .route("/folders", post(handlers::create_folder))
        .route("/folders/{folder_id}", delete(handlers::delete_folder))
        .layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth_gateway,
        ))
}
