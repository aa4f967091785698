//! Folder catalog management handlers (admin)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde_json::json;
use tracing::info;

use super::types::{CreateFolderRequest, FolderResponse};
use crate::auth::{AdminUser, ApiError};
use crate::state::AppState;
use reportal_core::{Company, NewFolder, Role, StoreError};

/// List all folder catalog entries
#[utoipa::path(
    get,
    path = "/api/folders",
    tag = "Folders",
    responses(
        (status = 200, description = "Folder catalog", body = [FolderResponse]),
        (status = 403, description = "Admin privileges required")
    )
)]
pub async fn list_folders(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<Vec<FolderResponse>>, ApiError> {
    let folders = state
        .folders
        .list()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(folders.into_iter().map(FolderResponse::from).collect()))
}

/// Create a folder catalog entry
#[utoipa::path(
    post,
    path = "/api/folders",
    tag = "Folders",
    request_body = CreateFolderRequest,
    responses(
        (status = 201, description = "Folder created", body = FolderResponse),
        (status = 400, description = "Invalid company or role"),
        (status = 403, description = "Admin privileges required")
    )
)]
pub async fn create_folder(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(request): Json<CreateFolderRequest>,
) -> Result<(StatusCode, Json<FolderResponse>), ApiError> {
    if request.name.trim().is_empty() {
        return Err(ApiError::MissingParameter("name"));
    }
    if request.path_prefix.trim().is_empty() {
        return Err(ApiError::MissingParameter("path_prefix"));
    }
    let company = request
        .company
        .parse::<Company>()
        .map_err(ApiError::InvalidField)?;
    let role_required = request
        .role_required
        .parse::<Role>()
        .map_err(ApiError::InvalidField)?;

    let folder = state
        .folders
        .create(NewFolder {
            name: request.name,
            path_prefix: request.path_prefix,
            company,
            role_required,
        })
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    info!(admin = %admin.local_user.email, folder = %folder.name, "Created report folder");
    Ok((StatusCode::CREATED, Json(FolderResponse::from(folder))))
}

/// Delete a folder catalog entry
#[utoipa::path(
    delete,
    path = "/api/folders/{folder_id}",
    tag = "Folders",
    params(("folder_id" = i64, Path, description = "Folder id")),
    responses(
        (status = 200, description = "Folder deleted"),
        (status = 404, description = "Folder not found")
    )
)]
pub async fn delete_folder(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(folder_id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.folders.delete(folder_id).await.map_err(|e| match e {
        StoreError::NotFound(_) => ApiError::NotFound("Folder not found"),
        other => ApiError::Internal(other.to_string()),
    })?;

    info!(admin = %admin.local_user.email, folder_id, "Deleted report folder");
    Ok(Json(json!({ "message": "Folder deleted successfully" })))
}
