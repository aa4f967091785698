//! Integration traits for external collaborators
//!
//! The gateway and the report handlers only ever talk to the identity
//! provider and the blob store through these traits, so tests can swap in
//! deterministic implementations.

use crate::error::{ObjectStoreError, ProviderError};
use crate::types::{Company, ObjectInfo, RemoteProfile, Role, VerifiedIdentity};
use async_trait::async_trait;
use std::time::Duration;

/// External identity provider (service of record for authentication)
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verify a bearer token and return the provider's user record
    async fn verify_token(&self, token: &str) -> Result<VerifiedIdentity, ProviderError>;

    /// Fetch company/role from the provider-hosted profile table
    ///
    /// The caller's own token is presented so that row-level security
    /// scoped to "own profile only" is satisfied. `Ok(None)` means the
    /// token verified but no profile row exists.
    async fn fetch_profile(
        &self,
        token: &str,
        identity_id: &str,
    ) -> Result<Option<RemoteProfile>, ProviderError>;

    /// Create a new remote identity (admin operation, auto-confirmed)
    async fn create_identity(
        &self,
        email: &str,
        password: &str,
    ) -> Result<VerifiedIdentity, ProviderError>;

    /// Delete a remote identity (admin operation; saga compensation)
    async fn delete_identity(&self, identity_id: &str) -> Result<(), ProviderError>;

    /// Create or update the provider-hosted profile row (best effort)
    async fn upsert_profile(
        &self,
        identity_id: &str,
        company: Company,
        role: Role,
    ) -> Result<(), ProviderError>;
}

/// Remote blob store holding the report objects
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List every object under the given key prefix
    async fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectInfo>, ObjectStoreError>;

    /// Produce a time-limited signed retrieval URL for one key
    ///
    /// No existence check is performed; the URL may point at a
    /// nonexistent object.
    async fn presign_get(&self, key: &str, ttl: Duration) -> Result<String, ObjectStoreError>;
}
