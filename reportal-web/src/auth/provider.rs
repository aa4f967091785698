//! Identity provider client (Supabase-style HTTP API)
//!
//! All calls carry an explicit bounded timeout; the underlying HTTP
//! client's defaults are never relied on. No retries: a single failure is
//! terminal for the request that triggered the call.

use async_trait::async_trait;
use reportal_core::{
    Company, IdentityProvider, ProviderError, RemoteProfile, Role, VerifiedIdentity,
};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::WebConfig;

/// Per-request timeout for provider calls
const PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for the hosted identity provider
///
/// Three credentials are in play: the caller's bearer token (verification
/// and row-level-security profile reads), the public anon key (attached to
/// every request), and the service-role key (admin user management).
#[derive(Debug, Clone)]
pub struct SupabaseProvider {
    http: reqwest::Client,
    url: Option<String>,
    anon_key: Option<String>,
    service_key: Option<String>,
}

impl SupabaseProvider {
    /// Build a provider client from the web configuration
    ///
    /// Fails when the HTTP client cannot be constructed; a client without
    /// the bounded timeout is never used.
    pub fn new(config: &WebConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(PROVIDER_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            url: config.provider_url.clone(),
            anon_key: config.provider_key.clone(),
            service_key: config.provider_service_key.clone(),
        })
    }

    /// Base URL + anon key, or a misconfiguration error
    fn base(&self) -> Result<(&str, &str), ProviderError> {
        match (self.url.as_deref(), self.anon_key.as_deref()) {
            (Some(url), Some(key)) if !url.is_empty() && !key.is_empty() => Ok((url, key)),
            _ => Err(ProviderError::Misconfigured(
                "provider URL or API key missing".to_string(),
            )),
        }
    }

    /// Service-role key, or a misconfiguration error
    fn service_key(&self) -> Result<&str, ProviderError> {
        match self.service_key.as_deref() {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(ProviderError::Misconfigured(
                "provider service role key missing".to_string(),
            )),
        }
    }
}

#[async_trait]
impl IdentityProvider for SupabaseProvider {
    async fn verify_token(&self, token: &str) -> Result<VerifiedIdentity, ProviderError> {
        let (url, anon_key) = self.base()?;

        let response = self
            .http
            .get(format!("{}/auth/v1/user", url))
            .header("apikey", anon_key)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ProviderError::Unreachable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            response
                .json::<VerifiedIdentity>()
                .await
                .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
        } else if status.as_u16() == 401 || status.as_u16() == 403 {
            Err(ProviderError::Denied(format!("token rejected ({})", status)))
        } else {
            Err(ProviderError::InvalidResponse(format!(
                "unexpected status {}",
                status
            )))
        }
    }

    async fn fetch_profile(
        &self,
        token: &str,
        identity_id: &str,
    ) -> Result<Option<RemoteProfile>, ProviderError> {
        let (url, anon_key) = self.base()?;

        // Authenticate with the caller's own token so that row-level
        // security scoped to "own profile only" is satisfied.
        let response = self
            .http
            .get(format!("{}/rest/v1/profiles", url))
            .query(&[
                ("id", format!("eq.{}", identity_id)),
                ("select", "company,role".to_string()),
            ])
            .header("apikey", anon_key)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ProviderError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Denied(format!(
                "profile read rejected ({})",
                status
            )));
        }

        let mut rows = response
            .json::<Vec<RemoteProfile>>()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        if rows.is_empty() {
            debug!(identity_id, "No provider profile row for identity");
            Ok(None)
        } else {
            Ok(Some(rows.remove(0)))
        }
    }

    async fn create_identity(
        &self,
        email: &str,
        password: &str,
    ) -> Result<VerifiedIdentity, ProviderError> {
        let (url, _) = self.base()?;
        let service_key = self.service_key()?;

        let response = self
            .http
            .post(format!("{}/auth/v1/admin/users", url))
            .header("apikey", service_key)
            .bearer_auth(service_key)
            .json(&json!({
                "email": email,
                "password": password,
                "email_confirm": true,
            }))
            .send()
            .await
            .map_err(|e| ProviderError::Unreachable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            response
                .json::<VerifiedIdentity>()
                .await
                .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
        } else {
            Err(ProviderError::Denied(format!(
                "identity creation rejected ({})",
                status
            )))
        }
    }

    async fn delete_identity(&self, identity_id: &str) -> Result<(), ProviderError> {
        let (url, _) = self.base()?;
        let service_key = self.service_key()?;

        let response = self
            .http
            .delete(format!("{}/auth/v1/admin/users/{}", url, identity_id))
            .header("apikey", service_key)
            .bearer_auth(service_key)
            .send()
            .await
            .map_err(|e| ProviderError::Unreachable(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ProviderError::Denied(format!(
                "identity deletion rejected ({})",
                response.status()
            )))
        }
    }

    async fn upsert_profile(
        &self,
        identity_id: &str,
        company: Company,
        role: Role,
    ) -> Result<(), ProviderError> {
        let (url, _) = self.base()?;
        let service_key = self.service_key()?;

        let response = self
            .http
            .post(format!("{}/rest/v1/profiles", url))
            .header("apikey", service_key)
            .header("Prefer", "resolution=merge-duplicates")
            .bearer_auth(service_key)
            .json(&json!([{
                "id": identity_id,
                "company": company.to_string(),
                "role": role.to_string(),
            }]))
            .send()
            .await
            .map_err(|e| ProviderError::Unreachable(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ProviderError::Denied(format!(
                "profile upsert rejected ({})",
                response.status()
            )))
        }
    }
}

/// Deterministic provider used by the test suites
#[cfg(test)]
pub mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory identity provider with scripted responses
    #[derive(Default)]
    pub struct MockProvider {
        /// token -> identity accepted by `verify_token`
        pub tokens: HashMap<String, VerifiedIdentity>,
        /// identity id -> provider-hosted profile row
        pub profiles: HashMap<String, RemoteProfile>,
        /// When set, `fetch_profile` fails with this flag
        pub fail_profile_fetch: bool,
        /// When set, `create_identity` fails
        pub fail_create: bool,
        /// Identity ids deleted through `delete_identity`
        pub deleted: Mutex<Vec<String>>,
        /// Profile upserts observed
        pub upserts: Mutex<Vec<(String, Company, Role)>>,
    }

    impl MockProvider {
        pub fn with_token(mut self, token: &str, id: &str, email: &str) -> Self {
            self.tokens.insert(
                token.to_string(),
                VerifiedIdentity {
                    id: id.to_string(),
                    email: email.to_string(),
                },
            );
            self
        }

        pub fn with_remote_profile(mut self, id: &str, company: &str, role: &str) -> Self {
            self.profiles.insert(
                id.to_string(),
                RemoteProfile {
                    company: Some(company.to_string()),
                    role: Some(role.to_string()),
                },
            );
            self
        }
    }

    #[async_trait]
    impl IdentityProvider for MockProvider {
        async fn verify_token(&self, token: &str) -> Result<VerifiedIdentity, ProviderError> {
            self.tokens
                .get(token)
                .cloned()
                .ok_or_else(|| ProviderError::Denied("token rejected (401)".to_string()))
        }

        async fn fetch_profile(
            &self,
            _token: &str,
            identity_id: &str,
        ) -> Result<Option<RemoteProfile>, ProviderError> {
            if self.fail_profile_fetch {
                return Err(ProviderError::Unreachable("profile fetch failed".to_string()));
            }
            Ok(self.profiles.get(identity_id).cloned())
        }

        async fn create_identity(
            &self,
            email: &str,
            _password: &str,
        ) -> Result<VerifiedIdentity, ProviderError> {
            if self.fail_create {
                return Err(ProviderError::Denied("identity creation rejected".to_string()));
            }
            Ok(VerifiedIdentity {
                id: format!("remote-{}", email),
                email: email.to_string(),
            })
        }

        async fn delete_identity(&self, identity_id: &str) -> Result<(), ProviderError> {
            self.deleted.lock().unwrap().push(identity_id.to_string());
            Ok(())
        }

        async fn upsert_profile(
            &self,
            identity_id: &str,
            company: Company,
            role: Role,
        ) -> Result<(), ProviderError> {
            self.upserts
                .lock()
                .unwrap()
                .push((identity_id.to_string(), company, role));
            Ok(())
        }
    }
}
