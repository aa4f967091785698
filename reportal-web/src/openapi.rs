//! OpenAPI specification for the report portal API

use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};

use crate::auth::handlers::{
    CreateUserRequest, PermissionsResponse, UpdateUserRequest, UserResponse,
};
use crate::handlers::types::{
    CreateFolderRequest, DownloadResponse, FolderListing, FolderResponse, HealthResponse,
    ReportFile,
};

/// Main OpenAPI specification for the report portal
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Reportal API",
        version = "0.1.0",
        description = "Role-gated report distribution over an external identity provider and blob store"
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    paths(
        // Health
        crate::handlers::health::health_check,

        // Reports
        crate::handlers::reports::list_reports,
        crate::handlers::reports::download_report,

        // User management
        crate::auth::handlers::list_users,
        crate::auth::handlers::create_user,
        crate::auth::handlers::get_user,
        crate::auth::handlers::update_user,
        crate::auth::handlers::delete_user,
        crate::auth::handlers::current_user_permissions,

        // Folder catalog
        crate::handlers::folders::list_folders,
        crate::handlers::folders::create_folder,
        crate::handlers::folders::delete_folder,
    ),
    components(
        schemas(
            HealthResponse,
            ReportFile,
            FolderListing,
            DownloadResponse,
            FolderResponse,
            CreateFolderRequest,
            UserResponse,
            CreateUserRequest,
            UpdateUserRequest,
            PermissionsResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Reports", description = "Report listing and downloads"),
        (name = "Users", description = "User provisioning and permissions"),
        (name = "Folders", description = "Report folder catalog management"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Security configuration for the API
pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_token",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

/// Get the OpenAPI document
pub fn api_doc() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
