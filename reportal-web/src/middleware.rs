//! Authentication gateway middleware
//!
//! Every API request passes through here. Requests without an
//! `Authorization` header continue anonymously (endpoints that need a
//! context reject them via the extractors). Requests with a credential
//! either get a fully resolved [`AuthContext`] attached or are rejected
//! with 401 before any handler runs.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::auth::{AuthContext, AuthError};
use crate::state::AppState;
use reportal_core::{CAN_VIEW_REPORTS, CAN_VIEW_USER_MANAGEMENT};

/// Resolve the bearer token into an `AuthContext` and attach it to the
/// request extensions
pub async fn auth_gateway(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let Some(header) = request.headers().get(axum::http::header::AUTHORIZATION) else {
        // Anonymous pass-through: no context is attached, endpoints that
        // require one reject downstream.
        return Ok(next.run(request).await);
    };

    let header = header.to_str().map_err(|_| AuthError::MalformedCredential)?;
    let token = header
        .split_whitespace()
        .nth(1)
        .ok_or(AuthError::MalformedCredential)?;

    // Phase 1: token verification. Any provider failure, from a rejected
    // token to an unreachable provider, collapses to the same 401; the
    // distinction stays in the log.
    let identity = match state.provider.verify_token(token).await {
        Ok(identity) => identity,
        Err(e) => {
            warn!("Token verification failed: {}", e);
            return Err(AuthError::InvalidCredential);
        }
    };

    // Phase 2: local user resolution, creating the row on first sight.
    let (local_user, created) = state
        .profiles
        .get_or_create_local_user(&identity.email)
        .await
        .map_err(|e| {
            warn!("Local user resolution failed: {}", e);
            AuthError::InvalidCredential
        })?;
    if created {
        debug!(email = %identity.email, "Created local user on first authentication");
    }

    // Phase 3: provider-hosted profile row, read with the caller's own
    // token. Failure here is never fatal; the fallback fields just stay
    // empty.
    let remote_profile = match state.provider.fetch_profile(token, &identity.id).await {
        Ok(profile) => profile,
        Err(e) => {
            warn!(identity_id = %identity.id, "Provider profile fetch failed: {}", e);
            None
        }
    };

    // Phase 4: local permission record. A missing record degrades to the
    // provider fallback with all capabilities denied; a store failure
    // degrades further to an empty capability map.
    let context = match state.profiles.get_by_remote_id(&identity.id).await {
        Ok(Some(profile)) => {
            let capabilities = HashMap::from([
                (CAN_VIEW_REPORTS.to_string(), profile.can_view_reports),
                (
                    CAN_VIEW_USER_MANAGEMENT.to_string(),
                    profile.can_view_user_management,
                ),
            ]);
            AuthContext {
                local_user,
                role: Some(profile.role.to_string()),
                company: Some(profile.company.to_string()),
                capabilities,
                profile: Some(profile),
                remote_identity_id: identity.id,
            }
        }
        Ok(None) => {
            debug!(identity_id = %identity.id, "No local permission record; using provider fallback");
            let remote = remote_profile.unwrap_or_default();
            AuthContext {
                local_user,
                profile: None,
                role: remote.role,
                company: remote.company,
                capabilities: HashMap::from([
                    (CAN_VIEW_REPORTS.to_string(), false),
                    (CAN_VIEW_USER_MANAGEMENT.to_string(), false),
                ]),
                remote_identity_id: identity.id,
            }
        }
        Err(e) => {
            warn!(identity_id = %identity.id, "Permission record lookup failed: {}", e);
            AuthContext {
                local_user,
                profile: None,
                role: None,
                company: None,
                capabilities: HashMap::new(),
                remote_identity_id: identity.id,
            }
        }
    };

    request.extensions_mut().insert(context);
    Ok(next.run(request).await)
}
