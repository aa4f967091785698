//! Authentication and authorization types for the request pipeline
//!
//! The gateway middleware (see `crate::middleware`) resolves the bearer
//! token into an [`AuthContext`] and stores it in the request extensions.
//! Handlers never look at ambient state: they receive the context through
//! the typed extractors defined here.

pub mod database;
pub mod handlers;
pub mod profiles;
pub mod provider;

#[cfg(test)]
mod tests;

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Json, Response},
};
use reportal_core::{LocalUser, Role, UserProfile};
use serde_json::json;
use std::collections::HashMap;
use tracing::warn;

/// Request-scoped authorization context produced by the gateway
///
/// `role` and `company` are kept as free-form strings because they may
/// come from the provider-hosted profile row when no local permission
/// record exists; they are parsed into [`Role`]/[`Company`] only at the
/// point of an authorization decision.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// The local identity row resolved (or created) for this request
    pub local_user: LocalUser,
    /// Local permission record, when one exists
    pub profile: Option<UserProfile>,
    /// Effective role name, possibly from the provider fallback
    pub role: Option<String>,
    /// Effective company name, possibly from the provider fallback
    pub company: Option<String>,
    /// Named capability flags; empty when the profile lookup failed
    pub capabilities: HashMap<String, bool>,
    /// Provider-side identity id; always present
    pub remote_identity_id: String,
}

impl AuthContext {
    /// Check a named capability flag (false when absent)
    pub fn has_capability(&self, name: &str) -> bool {
        self.capabilities.get(name).copied().unwrap_or(false)
    }

    /// Whether the effective role is Admin
    pub fn is_admin(&self) -> bool {
        self.role
            .as_deref()
            .and_then(|r| r.parse::<Role>().ok())
            .map(|r| r == Role::Admin)
            .unwrap_or(false)
    }
}

/// Authentication and authorization errors surfaced to the client
///
/// Detail about root causes stays in the log; the client only ever sees
/// the generic message for the matching taxonomy entry.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// An endpoint required a context but the request carried no credential
    #[error("Authentication credentials were not provided")]
    MissingCredential,
    /// Authorization header present but the token segment is missing
    #[error("Token prefix missing")]
    MalformedCredential,
    /// Provider rejected the token, was unreachable, or is misconfigured
    #[error("Invalid token")]
    InvalidCredential,
    /// Context lacks company or role
    #[error("User profile incomplete")]
    IncompleteProfile,
    /// Role string matches no known role
    #[error("Invalid Role")]
    InvalidRole,
    /// Key/prefix mismatch or missing admin override
    #[error("Unauthorized")]
    AuthorizationDenied,
    /// Caller is authenticated but not an admin
    #[error("Admin privileges required")]
    AdminRequired,
}

impl AuthError {
    fn status(&self) -> StatusCode {
        match self {
            AuthError::MissingCredential
            | AuthError::MalformedCredential
            | AuthError::InvalidCredential => StatusCode::UNAUTHORIZED,
            AuthError::IncompleteProfile
            | AuthError::InvalidRole
            | AuthError::AuthorizationDenied
            | AuthError::AdminRequired => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}

/// Handler-level API errors outside the authentication taxonomy
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Missing '{0}' parameter")]
    MissingParameter(&'static str),
    #[error("{0}")]
    InvalidField(String),
    #[error("User with this email already exists")]
    DuplicateIdentity,
    #[error("{0}")]
    NotFound(&'static str),
    #[error("Failed to create user in identity provider")]
    ProviderProvisioningFailed,
    #[error("Internal Server Error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingParameter(_)
            | ApiError::InvalidField(_)
            | ApiError::DuplicateIdentity => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ProviderProvisioningFailed | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}

/// Extractor for endpoints that require an authenticated caller
///
/// The gateway inserts the context; absence here means the request came
/// in without a credential (the gateway's anonymous pass-through).
pub struct AuthedUser(pub AuthContext);

impl<S> FromRequestParts<S> for AuthedUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .map(AuthedUser)
            .ok_or(AuthError::MissingCredential)
    }
}

/// Extractor for admin-only endpoints
pub struct AdminUser(pub AuthContext);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthedUser(context) = AuthedUser::from_request_parts(parts, state).await?;

        if context.is_admin() {
            Ok(AdminUser(context))
        } else {
            warn!(
                remote_identity_id = %context.remote_identity_id,
                role = ?context.role,
                "Admin access required but caller is not admin"
            );
            Err(AuthError::AdminRequired)
        }
    }
}
