//! Request/response types for the report endpoints

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use reportal_core::ReportFolder;

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
}

/// One downloadable object inside a folder listing
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReportFile {
    /// Basename of the object key
    pub name: String,
    /// Full object key, fed back into the download endpoint
    pub key: String,
    /// Last modification time, RFC 3339
    pub last_modified: Option<String>,
    /// Object size in bytes
    pub size: i64,
}

/// Listing for a single folder, possibly degraded
///
/// A folder whose blob store listing failed still appears in the
/// response, with no files and the error recorded, so one broken prefix
/// never hides the rest.
#[derive(Debug, Serialize, ToSchema)]
pub struct FolderListing {
    pub id: i64,
    pub name: String,
    pub files: Vec<ReportFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Presigned download URL
#[derive(Debug, Serialize, ToSchema)]
pub struct DownloadResponse {
    pub url: String,
}

/// Folder catalog entry as returned to clients
#[derive(Debug, Serialize, ToSchema)]
pub struct FolderResponse {
    pub id: i64,
    pub name: String,
    pub path_prefix: String,
    pub company: String,
    pub role_required: String,
    pub created_at: String,
}

impl From<ReportFolder> for FolderResponse {
    fn from(folder: ReportFolder) -> Self {
        Self {
            id: folder.id,
            name: folder.name,
            path_prefix: folder.path_prefix,
            company: folder.company.to_string(),
            role_required: folder.role_required.to_string(),
            created_at: folder.created_at.to_rfc3339(),
        }
    }
}

/// Request body for creating a folder catalog entry
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateFolderRequest {
    pub name: String,
    pub path_prefix: String,
    pub company: String,
    pub role_required: String,
}
