//! Shared application state

use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;
use tracing::{info, warn};

use crate::auth::database::DatabaseStore;
use crate::auth::profiles::{FolderStore, ProfileStore};
use crate::auth::provider::SupabaseProvider;
use crate::storage::{MemoryObjectStore, S3ObjectStore};
use crate::{WebConfig, WebError, WebResult};
use reportal_core::{IdentityProvider, ObjectStore};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Web server configuration
    pub config: WebConfig,
    /// Local permission records and identity rows
    pub profiles: ProfileStore,
    /// Folder catalog
    pub folders: FolderStore,
    /// External identity provider
    pub provider: Arc<dyn IdentityProvider>,
    /// Blob store holding the report objects
    pub objects: Arc<dyn ObjectStore>,
}

impl AppState {
    /// Build the state from configuration, wiring real backends where
    /// configured and falling back to in-memory stand-ins otherwise
    pub async fn new(config: WebConfig) -> WebResult<Self> {
        let provider: Arc<dyn IdentityProvider> = Arc::new(
            SupabaseProvider::new(&config)
                .map_err(|e| WebError::Config(format!("HTTP client: {}", e)))?,
        );

        let (profiles, folders) = match &config.database_url {
            Some(url) => match Self::connect_database(url).await {
                Ok(store) => {
                    info!("Using database-backed identity store: {}", url);
                    (
                        ProfileStore::database(store.clone()),
                        FolderStore::database(store),
                    )
                }
                Err(e) => {
                    warn!(
                        "Database connection failed ({}), falling back to memory stores",
                        e
                    );
                    (ProfileStore::memory(), FolderStore::memory())
                }
            },
            None => {
                warn!("No DATABASE_URL configured, using memory stores");
                (ProfileStore::memory(), FolderStore::memory())
            }
        };

        let objects: Arc<dyn ObjectStore> = match &config.storage_bucket {
            Some(bucket) => {
                info!("Using blob store bucket: {}", bucket);
                Arc::new(S3ObjectStore::new(bucket, config.storage_region.as_deref()).await)
            }
            None => {
                warn!("No storage bucket configured, using memory object store");
                Arc::new(MemoryObjectStore::default())
            }
        };

        Ok(Self {
            config,
            profiles,
            folders,
            provider,
            objects,
        })
    }

    async fn connect_database(url: &str) -> Result<DatabaseStore, String> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|e| e.to_string())?;
        DatabaseStore::new(pool).await.map_err(|e| e.to_string())
    }

    /// State wired entirely to in-memory backends, for the test suites
    #[cfg(test)]
    pub fn for_tests(
        provider: Arc<dyn IdentityProvider>,
        objects: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            config: WebConfig::default(),
            profiles: ProfileStore::memory(),
            folders: FolderStore::memory(),
            provider,
            objects,
        }
    }
}
