//! Local identity store: permission records and the folder catalog
//!
//! Both stores come in a memory variant (development and tests) and a
//! database variant (production). Concurrent get-or-create and update
//! rely on the backing store's own atomicity, not on request-level locks.

use super::database::DatabaseStore;
use chrono::Utc;
use reportal_core::{
    LocalUser, NewFolder, NewProfile, ProfileUpdate, ReportFolder, StoreError, UserProfile,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Store for local users and permission records
#[derive(Clone)]
pub enum ProfileStore {
    /// In-memory storage (for development and testing)
    Memory {
        local_users: Arc<RwLock<HashMap<String, LocalUser>>>,
        profiles: Arc<RwLock<Vec<UserProfile>>>,
        next_id: Arc<AtomicI64>,
    },
    /// Database storage (for production)
    Database(DatabaseStore),
}

impl Default for ProfileStore {
    fn default() -> Self {
        Self::memory()
    }
}

impl ProfileStore {
    /// Create an in-memory profile store
    pub fn memory() -> Self {
        Self::Memory {
            local_users: Arc::new(RwLock::new(HashMap::new())),
            profiles: Arc::new(RwLock::new(Vec::new())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }

    /// Create a database-backed profile store
    pub fn database(store: DatabaseStore) -> Self {
        Self::Database(store)
    }

    /// Resolve the local user row for an email, creating it when absent
    ///
    /// Returns the row and whether it was created by this call. This is
    /// the only write the authentication gateway ever performs.
    pub async fn get_or_create_local_user(
        &self,
        email: &str,
    ) -> Result<(LocalUser, bool), StoreError> {
        match self {
            Self::Memory {
                local_users,
                next_id,
                ..
            } => {
                let mut users = local_users.write().await;
                if let Some(user) = users.get(email) {
                    return Ok((user.clone(), false));
                }

                let user = LocalUser {
                    id: next_id.fetch_add(1, Ordering::SeqCst),
                    email: email.to_string(),
                    created_at: Utc::now(),
                };
                users.insert(email.to_string(), user.clone());
                debug!(email, "Created local user");
                Ok((user, true))
            }
            Self::Database(db) => db.get_or_create_local_user(email).await,
        }
    }

    /// Fetch a permission record by the provider-side identity id
    pub async fn get_by_remote_id(&self, id: &str) -> Result<Option<UserProfile>, StoreError> {
        match self {
            Self::Memory { profiles, .. } => {
                let profiles = profiles.read().await;
                Ok(profiles.iter().find(|p| p.remote_identity_id == id).cloned())
            }
            Self::Database(db) => db.get_profile_by_remote_id(id).await,
        }
    }

    /// Fetch a permission record by its local id
    pub async fn get(&self, id: i64) -> Result<Option<UserProfile>, StoreError> {
        match self {
            Self::Memory { profiles, .. } => {
                let profiles = profiles.read().await;
                Ok(profiles.iter().find(|p| p.id == id).cloned())
            }
            Self::Database(db) => db.get_profile(id).await,
        }
    }

    /// List every permission record, newest first
    pub async fn list(&self) -> Result<Vec<UserProfile>, StoreError> {
        match self {
            Self::Memory { profiles, .. } => {
                let profiles = profiles.read().await;
                let mut all = profiles.clone();
                all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                Ok(all)
            }
            Self::Database(db) => db.list_profiles().await,
        }
    }

    /// Create a permission record
    ///
    /// Fails with [`StoreError::Duplicate`] when either the remote
    /// identity id or the email is already taken.
    pub async fn create(&self, fields: NewProfile) -> Result<UserProfile, StoreError> {
        match self {
            Self::Memory {
                profiles, next_id, ..
            } => {
                let mut profiles = profiles.write().await;
                if profiles.iter().any(|p| {
                    p.remote_identity_id == fields.remote_identity_id || p.email == fields.email
                }) {
                    return Err(StoreError::Duplicate(fields.email));
                }

                let now = Utc::now();
                let profile = UserProfile {
                    id: next_id.fetch_add(1, Ordering::SeqCst),
                    remote_identity_id: fields.remote_identity_id,
                    email: fields.email,
                    company: fields.company,
                    role: fields.role,
                    can_view_reports: fields.can_view_reports,
                    can_view_user_management: fields.can_view_user_management,
                    is_active: true,
                    created_at: now,
                    updated_at: now,
                };
                profiles.push(profile.clone());
                info!(email = %profile.email, "Created permission record");
                Ok(profile)
            }
            Self::Database(db) => db.create_profile(fields).await,
        }
    }

    /// Apply a partial update; unspecified fields are left untouched
    pub async fn update(&self, id: i64, update: ProfileUpdate) -> Result<UserProfile, StoreError> {
        match self {
            Self::Memory { profiles, .. } => {
                let mut profiles = profiles.write().await;
                let profile = profiles
                    .iter_mut()
                    .find(|p| p.id == id)
                    .ok_or_else(|| StoreError::NotFound(format!("profile {}", id)))?;

                if let Some(company) = update.company {
                    profile.company = company;
                }
                if let Some(role) = update.role {
                    profile.role = role;
                }
                if let Some(flag) = update.can_view_reports {
                    profile.can_view_reports = flag;
                }
                if let Some(flag) = update.can_view_user_management {
                    profile.can_view_user_management = flag;
                }
                if let Some(active) = update.is_active {
                    profile.is_active = active;
                }
                profile.updated_at = Utc::now();
                Ok(profile.clone())
            }
            Self::Database(db) => db.update_profile(id, update).await,
        }
    }

    /// Soft delete: set `is_active = false`; idempotent
    pub async fn deactivate(&self, id: i64) -> Result<(), StoreError> {
        match self {
            Self::Memory { profiles, .. } => {
                let mut profiles = profiles.write().await;
                let profile = profiles
                    .iter_mut()
                    .find(|p| p.id == id)
                    .ok_or_else(|| StoreError::NotFound(format!("profile {}", id)))?;
                profile.is_active = false;
                profile.updated_at = Utc::now();
                Ok(())
            }
            Self::Database(db) => db.deactivate_profile(id).await,
        }
    }
}

/// Store for the admin-managed folder catalog
#[derive(Clone)]
pub enum FolderStore {
    /// In-memory storage (for development and testing)
    Memory {
        folders: Arc<RwLock<Vec<ReportFolder>>>,
        next_id: Arc<AtomicI64>,
    },
    /// Database storage (for production)
    Database(DatabaseStore),
}

impl Default for FolderStore {
    fn default() -> Self {
        Self::memory()
    }
}

impl FolderStore {
    /// Create an in-memory folder store
    pub fn memory() -> Self {
        Self::Memory {
            folders: Arc::new(RwLock::new(Vec::new())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }

    /// Create a database-backed folder store
    pub fn database(store: DatabaseStore) -> Self {
        Self::Database(store)
    }

    /// List the whole catalog in stable (insertion) order
    pub async fn list(&self) -> Result<Vec<ReportFolder>, StoreError> {
        match self {
            Self::Memory { folders, .. } => Ok(folders.read().await.clone()),
            Self::Database(db) => db.list_folders().await,
        }
    }

    /// List the catalog entries for one company, in stable order
    ///
    /// The company comes in as the context's free-form string; an unknown
    /// value simply matches nothing.
    pub async fn list_for_company(&self, company: &str) -> Result<Vec<ReportFolder>, StoreError> {
        match self {
            Self::Memory { folders, .. } => {
                let folders = folders.read().await;
                Ok(folders
                    .iter()
                    .filter(|f| f.company.to_string() == company)
                    .cloned()
                    .collect())
            }
            Self::Database(db) => db.list_folders_for_company(company).await,
        }
    }

    /// Add a catalog entry
    pub async fn create(&self, fields: NewFolder) -> Result<ReportFolder, StoreError> {
        match self {
            Self::Memory { folders, next_id } => {
                let folder = ReportFolder {
                    id: next_id.fetch_add(1, Ordering::SeqCst),
                    name: fields.name,
                    path_prefix: fields.path_prefix,
                    company: fields.company,
                    role_required: fields.role_required,
                    created_at: Utc::now(),
                };
                folders.write().await.push(folder.clone());
                info!(name = %folder.name, prefix = %folder.path_prefix, "Created report folder");
                Ok(folder)
            }
            Self::Database(db) => db.create_folder(fields).await,
        }
    }

    /// Remove a catalog entry
    pub async fn delete(&self, id: i64) -> Result<(), StoreError> {
        match self {
            Self::Memory { folders, .. } => {
                let mut folders = folders.write().await;
                let before = folders.len();
                folders.retain(|f| f.id != id);
                if folders.len() == before {
                    return Err(StoreError::NotFound(format!("folder {}", id)));
                }
                Ok(())
            }
            Self::Database(db) => db.delete_folder(id).await,
        }
    }
}
