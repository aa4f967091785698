//! Tagged error types for each integration boundary
//!
//! The original system funneled every provider and store failure through a
//! single catch-all; here each boundary returns its own enum so callers
//! match exhaustively and decide per variant what reaches the client.

use thiserror::Error;

/// Failures from the external identity provider
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Provider URL or API key missing from configuration
    #[error("identity provider is not configured: {0}")]
    Misconfigured(String),

    /// The provider rejected the presented token or identity
    #[error("identity provider denied the request: {0}")]
    Denied(String),

    /// Transport-level failure (connect, timeout, protocol)
    #[error("identity provider unreachable: {0}")]
    Unreachable(String),

    /// The provider answered with something we could not decode
    #[error("unexpected identity provider response: {0}")]
    InvalidResponse(String),
}

/// Failures from the local identity store
#[derive(Error, Debug)]
pub enum StoreError {
    /// remote_identity_id or email already exists
    #[error("duplicate identity: {0}")]
    Duplicate(String),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("storage failure: {0}")]
    Backend(String),
}

/// Failures from the blob store
#[derive(Error, Debug)]
pub enum ObjectStoreError {
    /// The store denied access to the requested prefix or key
    #[error("object store access denied: {0}")]
    AccessDenied(String),

    #[error("object store request failed: {0}")]
    Request(String),
}
