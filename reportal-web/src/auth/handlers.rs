//! User management handlers (admin) and the caller-permissions endpoint

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};
use utoipa::ToSchema;

use crate::auth::{AdminUser, ApiError, AuthedUser};
use crate::state::AppState;
use reportal_core::{Company, NewProfile, ProfileUpdate, Role, StoreError, UserProfile};

/// Request body for creating a user
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub company: String,
    pub role: String,
    #[serde(default = "default_true")]
    pub can_view_reports: bool,
    #[serde(default)]
    pub can_view_user_management: bool,
}

fn default_true() -> bool {
    true
}

/// Request body for updating a user (all fields optional)
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub company: Option<String>,
    pub role: Option<String>,
    pub can_view_reports: Option<bool>,
    pub can_view_user_management: Option<bool>,
    pub is_active: Option<bool>,
}

/// Permission record as returned to clients
#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub remote_identity_id: String,
    pub email: String,
    pub company: String,
    pub role: String,
    pub can_view_reports: bool,
    pub can_view_user_management: bool,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<UserProfile> for UserResponse {
    fn from(profile: UserProfile) -> Self {
        Self {
            id: profile.id,
            remote_identity_id: profile.remote_identity_id,
            email: profile.email,
            company: profile.company.to_string(),
            role: profile.role.to_string(),
            can_view_reports: profile.can_view_reports,
            can_view_user_management: profile.can_view_user_management,
            is_active: profile.is_active,
            created_at: profile.created_at.to_rfc3339(),
            updated_at: profile.updated_at.to_rfc3339(),
        }
    }
}

/// Capability summary for the authenticated caller
#[derive(Debug, Serialize, ToSchema)]
pub struct PermissionsResponse {
    pub email: String,
    pub company: String,
    pub role: String,
    pub can_view_reports: bool,
    pub can_view_user_management: bool,
    pub is_active: bool,
}

fn parse_company(raw: &str) -> Result<Company, ApiError> {
    raw.parse::<Company>().map_err(ApiError::InvalidField)
}

fn parse_role(raw: &str) -> Result<Role, ApiError> {
    raw.parse::<Role>().map_err(ApiError::InvalidField)
}

/// List all permission records
#[utoipa::path(
    get,
    path = "/api/users",
    tag = "Users",
    responses(
        (status = 200, description = "Permission records", body = [UserResponse]),
        (status = 403, description = "Admin privileges required")
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let profiles = state
        .profiles
        .list()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(profiles.into_iter().map(UserResponse::from).collect()))
}

/// Create a remote identity and its local permission record
///
/// Two-phase: the remote identity is created first, then the local record.
/// If the second phase fails the remote identity is deleted again so no
/// half-provisioned account can authenticate. A failed compensation leaves
/// an orphan, which is logged for manual cleanup.
#[utoipa::path(
    post,
    path = "/api/users",
    tag = "Users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Invalid or duplicate user"),
        (status = 403, description = "Admin privileges required"),
        (status = 500, description = "Identity provider failure")
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    if request.email.trim().is_empty() {
        return Err(ApiError::MissingParameter("email"));
    }
    if request.password.is_empty() {
        return Err(ApiError::MissingParameter("password"));
    }
    let company = parse_company(&request.company)?;
    let role = parse_role(&request.role)?;

    info!(email = %request.email, admin = %admin.local_user.email, "Provisioning user");

    // Phase 1: remote identity
    let identity = state
        .provider
        .create_identity(&request.email, &request.password)
        .await
        .map_err(|e| {
            error!("Identity provider rejected user creation: {}", e);
            ApiError::ProviderProvisioningFailed
        })?;

    // Phase 2: local permission record, compensating on failure
    let profile = match state
        .profiles
        .create(NewProfile {
            remote_identity_id: identity.id.clone(),
            email: request.email.clone(),
            company,
            role,
            can_view_reports: request.can_view_reports,
            can_view_user_management: request.can_view_user_management,
        })
        .await
    {
        Ok(profile) => profile,
        Err(e) => {
            if let Err(comp) = state.provider.delete_identity(&identity.id).await {
                error!(
                    identity_id = %identity.id,
                    "Compensation failed, orphaned remote identity: {}",
                    comp
                );
            }
            return Err(match e {
                StoreError::Duplicate(_) => ApiError::DuplicateIdentity,
                other => ApiError::Internal(other.to_string()),
            });
        }
    };

    // Best effort: mirror company/role into the provider-hosted profile
    // row so the gateway fallback stays consistent.
    if let Err(e) = state.provider.upsert_profile(&identity.id, company, role).await {
        warn!(identity_id = %identity.id, "Provider profile upsert failed: {}", e);
    }

    Ok((StatusCode::CREATED, Json(UserResponse::from(profile))))
}

/// Fetch a single permission record
#[utoipa::path(
    get,
    path = "/api/users/{user_id}",
    tag = "Users",
    params(("user_id" = i64, Path, description = "Permission record id")),
    responses(
        (status = 200, description = "Permission record", body = UserResponse),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(user_id): Path<i64>,
) -> Result<Json<UserResponse>, ApiError> {
    let profile = state
        .profiles
        .get(user_id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .ok_or(ApiError::NotFound("User not found"))?;

    Ok(Json(UserResponse::from(profile)))
}

/// Partially update a permission record
#[utoipa::path(
    put,
    path = "/api/users/{user_id}",
    tag = "Users",
    params(("user_id" = i64, Path, description = "Permission record id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated record", body = UserResponse),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(user_id): Path<i64>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let update = ProfileUpdate {
        company: request.company.as_deref().map(parse_company).transpose()?,
        role: request.role.as_deref().map(parse_role).transpose()?,
        can_view_reports: request.can_view_reports,
        can_view_user_management: request.can_view_user_management,
        is_active: request.is_active,
    };

    let profile = state
        .profiles
        .update(user_id, update)
        .await
        .map_err(|e| match e {
            StoreError::NotFound(_) => ApiError::NotFound("User not found"),
            other => ApiError::Internal(other.to_string()),
        })?;

    if let Err(e) = state
        .provider
        .upsert_profile(&profile.remote_identity_id, profile.company, profile.role)
        .await
    {
        warn!(
            identity_id = %profile.remote_identity_id,
            "Provider profile upsert failed: {}",
            e
        );
    }

    Ok(Json(UserResponse::from(profile)))
}

/// Deactivate a permission record
///
/// Soft delete: the remote identity stays and the flag simply flips. The
/// gateway itself does not consult the flag; enforcement is up to the
/// capability checks on individual endpoints.
#[utoipa::path(
    delete,
    path = "/api/users/{user_id}",
    tag = "Users",
    params(("user_id" = i64, Path, description = "Permission record id")),
    responses(
        (status = 200, description = "User deactivated"),
        (status = 404, description = "User not found")
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(user_id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .profiles
        .deactivate(user_id)
        .await
        .map_err(|e| match e {
            StoreError::NotFound(_) => ApiError::NotFound("User not found"),
            other => ApiError::Internal(other.to_string()),
        })?;

    Ok(Json(json!({ "message": "User deactivated successfully" })))
}

/// Capability summary for the authenticated caller
#[utoipa::path(
    get,
    path = "/api/users/me/permissions",
    tag = "Users",
    responses(
        (status = 200, description = "Caller permissions", body = PermissionsResponse),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "No permission record")
    )
)]
pub async fn current_user_permissions(
    State(state): State<AppState>,
    AuthedUser(context): AuthedUser,
) -> Result<Json<PermissionsResponse>, ApiError> {
    let profile = state
        .profiles
        .get_by_remote_id(&context.remote_identity_id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .ok_or(ApiError::NotFound(
            "User profile not found. Please contact administrator.",
        ))?;

    Ok(Json(PermissionsResponse {
        email: profile.email,
        company: profile.company.to_string(),
        role: profile.role.to_string(),
        can_view_reports: profile.can_view_reports,
        can_view_user_management: profile.can_view_user_management,
        is_active: profile.is_active,
    }))
}
