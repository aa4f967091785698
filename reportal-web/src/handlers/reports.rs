//! Report listing and download handlers

use std::collections::HashMap;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json, Response},
};
use tracing::{info, warn};

use super::types::{DownloadResponse, FolderListing, ReportFile};
use crate::auth::{ApiError, AuthContext, AuthError, AuthedUser};
use crate::state::AppState;
use reportal_core::{ObjectStoreError, ReportFolder, Role};

/// Lifetime of presigned download URLs
const DOWNLOAD_URL_TTL: Duration = Duration::from_secs(3600);

/// Errors from the report endpoints, either taxonomy
#[derive(Debug)]
pub enum ReportError {
    Auth(AuthError),
    Api(ApiError),
}

impl From<AuthError> for ReportError {
    fn from(e: AuthError) -> Self {
        ReportError::Auth(e)
    }
}

impl From<ApiError> for ReportError {
    fn from(e: ApiError) -> Self {
        ReportError::Api(e)
    }
}

impl IntoResponse for ReportError {
    fn into_response(self) -> Response {
        match self {
            ReportError::Auth(e) => e.into_response(),
            ReportError::Api(e) => e.into_response(),
        }
    }
}

/// Effective company and parsed role, or the matching 403
fn company_and_role(context: &AuthContext) -> Result<(String, Role), AuthError> {
    let (Some(company), Some(role)) = (context.company.clone(), context.role.as_deref()) else {
        return Err(AuthError::IncompleteProfile);
    };
    let role = role.parse::<Role>().map_err(|_| AuthError::InvalidRole)?;
    Ok((company, role))
}

/// List report folders visible to the caller, with their files
///
/// Folders are resolved one at a time; a blob store failure on one
/// prefix flags that folder and moves on.
#[utoipa::path(
    get,
    path = "/api/reports/list",
    tag = "Reports",
    responses(
        (status = 200, description = "Visible folders and files", body = [FolderListing]),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Incomplete profile or unknown role")
    )
)]
pub async fn list_reports(
    State(state): State<AppState>,
    AuthedUser(context): AuthedUser,
) -> Result<Json<Vec<FolderListing>>, ReportError> {
    let (company, role) = company_and_role(&context)?;

    // Every role is company-scoped; Admin only skips the role filter.
    let folders: Vec<ReportFolder> = state
        .folders
        .list_for_company(&company)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .into_iter()
        .filter(|f| role.can_access(f.role_required))
        .collect();

    info!(
        email = %context.local_user.email,
        folders = folders.len(),
        "Listing report folders"
    );

    let mut listings = Vec::with_capacity(folders.len());
    for folder in folders {
        match state.objects.list_objects(&folder.path_prefix).await {
            Ok(objects) => {
                let mut files: Vec<ReportFile> = objects
                    .into_iter()
                    // The placeholder object that marks the folder itself
                    // is not a report.
                    .filter(|o| {
                        o.key != folder.path_prefix
                            && o.key != format!("{}/", folder.path_prefix)
                    })
                    .filter_map(|o| {
                        let name = o.key.rsplit('/').next().unwrap_or_default().to_string();
                        if name.is_empty() {
                            return None;
                        }
                        Some(ReportFile {
                            name,
                            key: o.key,
                            last_modified: o.last_modified.map(|t| t.to_rfc3339()),
                            size: o.size,
                        })
                    })
                    .collect();
                files.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));

                listings.push(FolderListing {
                    id: folder.id,
                    name: folder.name,
                    files,
                    error: None,
                });
            }
            Err(e) => {
                warn!(
                    folder = %folder.name,
                    prefix = %folder.path_prefix,
                    "Folder listing failed: {}",
                    e
                );
                let name = match &e {
                    ObjectStoreError::AccessDenied(_) => {
                        format!("{} (ACCESS ERROR)", folder.name)
                    }
                    ObjectStoreError::Request(_) => format!("{} (ERROR)", folder.name),
                };
                listings.push(FolderListing {
                    id: folder.id,
                    name,
                    files: Vec::new(),
                    error: Some(e.to_string()),
                });
            }
        }
    }

    Ok(Json(listings))
}

/// Generate a presigned download URL for an object key
///
/// Authorization is prefix containment against the caller's company
/// folders, with no role filter; admins may fetch any key. Existence is
/// not checked, a URL for a missing key simply 404s at the blob store.
#[utoipa::path(
    get,
    path = "/api/reports/download",
    tag = "Reports",
    params(("key" = String, Query, description = "Object key to download")),
    responses(
        (status = 200, description = "Presigned URL", body = DownloadResponse),
        (status = 400, description = "Missing key parameter"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Key outside the caller's folders"),
        (status = 500, description = "Blob store failure")
    )
)]
pub async fn download_report(
    State(state): State<AppState>,
    AuthedUser(context): AuthedUser,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<DownloadResponse>, ReportError> {
    let key = params
        .get("key")
        .filter(|k| !k.is_empty())
        .ok_or(ApiError::MissingParameter("key"))?;

    // Prefix containment against the caller's company folders; no role
    // filter here. A missing company matches no folders, so only the
    // admin override can still succeed.
    if !context.is_admin() {
        let company = context.company.clone().unwrap_or_default();
        let folders = state
            .folders
            .list_for_company(&company)
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?;

        let allowed = folders.iter().any(|f| key.starts_with(&f.path_prefix));
        if !allowed {
            warn!(
                email = %context.local_user.email,
                key,
                "Download denied, key outside caller's folders"
            );
            return Err(AuthError::AuthorizationDenied.into());
        }
    }

    let url = state
        .objects
        .presign_get(key, DOWNLOAD_URL_TTL)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    info!(email = %context.local_user.email, key, "Issued presigned download URL");
    Ok(Json(DownloadResponse { url }))
}
