//! Database-backed identity store implementation

use chrono::{DateTime, Utc};
use reportal_core::{
    Company, LocalUser, NewFolder, NewProfile, ProfileUpdate, ReportFolder, Role, StoreError,
    UserProfile,
};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::{error, info};

/// Shared SQLite-backed store for local users, permission records and the
/// folder catalog
#[derive(Debug, Clone)]
pub struct DatabaseStore {
    pool: SqlitePool,
}

impl DatabaseStore {
    /// Create the store and ensure the schema exists
    pub async fn new(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.create_tables().await?;
        Ok(store)
    }

    /// Access the underlying pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn create_tables(&self) -> Result<(), StoreError> {
        // local_users keeps legacy nullable company/role columns for schema
        // fidelity with the system this replaces; nothing reads them, the
        // AuthContext is the only carrier at request time.
        let query = r#"
            CREATE TABLE IF NOT EXISTS local_users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT UNIQUE NOT NULL,
                company TEXT,
                role TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS user_profiles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                remote_identity_id TEXT UNIQUE NOT NULL,
                email TEXT UNIQUE NOT NULL,
                company TEXT NOT NULL,
                role TEXT NOT NULL,
                can_view_reports BOOLEAN NOT NULL DEFAULT TRUE,
                can_view_user_management BOOLEAN NOT NULL DEFAULT FALSE,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_profiles_remote_id
                ON user_profiles(remote_identity_id);
            CREATE INDEX IF NOT EXISTS idx_profiles_email ON user_profiles(email);

            CREATE TABLE IF NOT EXISTS report_folders (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                path_prefix TEXT NOT NULL,
                company TEXT NOT NULL,
                role_required TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
        "#;

        sqlx::query(query).execute(&self.pool).await.map_err(|e| {
            error!("Failed to create identity store tables: {}", e);
            StoreError::Backend(e.to_string())
        })?;

        info!("Identity store tables ready");
        Ok(())
    }

    pub async fn get_or_create_local_user(
        &self,
        email: &str,
    ) -> Result<(LocalUser, bool), StoreError> {
        let result = sqlx::query(
            "INSERT INTO local_users (email, created_at) VALUES (?, ?) \
             ON CONFLICT(email) DO NOTHING",
        )
        .bind(email)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        let created = result.rows_affected() == 1;

        let row = sqlx::query("SELECT id, email, created_at FROM local_users WHERE email = ?")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok((local_user_from_row(&row)?, created))
    }

    pub async fn get_profile_by_remote_id(
        &self,
        remote_id: &str,
    ) -> Result<Option<UserProfile>, StoreError> {
        let row = sqlx::query("SELECT * FROM user_profiles WHERE remote_identity_id = ?")
            .bind(remote_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        row.map(|r| profile_from_row(&r)).transpose()
    }

    pub async fn get_profile(&self, id: i64) -> Result<Option<UserProfile>, StoreError> {
        let row = sqlx::query("SELECT * FROM user_profiles WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        row.map(|r| profile_from_row(&r)).transpose()
    }

    pub async fn list_profiles(&self) -> Result<Vec<UserProfile>, StoreError> {
        let rows = sqlx::query("SELECT * FROM user_profiles ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        rows.iter().map(profile_from_row).collect()
    }

    pub async fn create_profile(&self, fields: NewProfile) -> Result<UserProfile, StoreError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO user_profiles
                (remote_identity_id, email, company, role,
                 can_view_reports, can_view_user_management, is_active,
                 created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, TRUE, ?, ?)
            "#,
        )
        .bind(&fields.remote_identity_id)
        .bind(&fields.email)
        .bind(fields.company.to_string())
        .bind(fields.role.to_string())
        .bind(fields.can_view_reports)
        .bind(fields.can_view_user_management)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(UserProfile {
                id: done.last_insert_rowid(),
                remote_identity_id: fields.remote_identity_id,
                email: fields.email,
                company: fields.company,
                role: fields.role,
                can_view_reports: fields.can_view_reports,
                can_view_user_management: fields.can_view_user_management,
                is_active: true,
                created_at: now,
                updated_at: now,
            }),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(StoreError::Duplicate(fields.email))
            }
            Err(e) => Err(StoreError::Backend(e.to_string())),
        }
    }

    pub async fn update_profile(
        &self,
        id: i64,
        update: ProfileUpdate,
    ) -> Result<UserProfile, StoreError> {
        let mut profile = self
            .get_profile(id)
            .await?
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

        sqlx::query(
            r#"
            UPDATE user_profiles
            SET company = ?, role = ?, can_view_reports = ?,
                can_view_user_management = ?, is_active = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(profile.company.to_string())
        .bind(profile.role.to_string())
        .bind(profile.can_view_reports)
        .bind(profile.can_view_user_management)
        .bind(profile.is_active)
        .bind(profile.updated_at.to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(profile)
    }

    pub async fn deactivate_profile(&self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE user_profiles SET is_active = FALSE, updated_at = ? WHERE id = ?",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("profile {}", id)));
        }
        Ok(())
    }

    pub async fn list_folders(&self) -> Result<Vec<ReportFolder>, StoreError> {
        let rows = sqlx::query("SELECT * FROM report_folders ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        rows.iter().map(folder_from_row).collect()
    }

    pub async fn list_folders_for_company(
        &self,
        company: &str,
    ) -> Result<Vec<ReportFolder>, StoreError> {
        let rows = sqlx::query("SELECT * FROM report_folders WHERE company = ? ORDER BY id")
            .bind(company)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        rows.iter().map(folder_from_row).collect()
    }

    pub async fn create_folder(&self, fields: NewFolder) -> Result<ReportFolder, StoreError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO report_folders (name, path_prefix, company, role_required, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&fields.name)
        .bind(&fields.path_prefix)
        .bind(fields.company.to_string())
        .bind(fields.role_required.to_string())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(ReportFolder {
            id: result.last_insert_rowid(),
            name: fields.name,
            path_prefix: fields.path_prefix,
            company: fields.company,
            role_required: fields.role_required,
            created_at: now,
        })
    }

    pub async fn delete_folder(&self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM report_folders WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("folder {}", id)));
        }
        Ok(())
    }
}

fn local_user_from_row(row: &SqliteRow) -> Result<LocalUser, StoreError> {
    Ok(LocalUser {
        id: row.get("id"),
        email: row.get("email"),
        created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
    })
}

fn profile_from_row(row: &SqliteRow) -> Result<UserProfile, StoreError> {
    let company: String = row.get("company");
    let role: String = row.get("role");

    Ok(UserProfile {
        id: row.get("id"),
        remote_identity_id: row.get("remote_identity_id"),
        email: row.get("email"),
        company: company
            .parse::<Company>()
            .map_err(StoreError::Backend)?,
        role: role.parse::<Role>().map_err(StoreError::Backend)?,
        can_view_reports: row.get("can_view_reports"),
        can_view_user_management: row.get("can_view_user_management"),
        is_active: row.get("is_active"),
        created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
        updated_at: parse_timestamp(&row.get::<String, _>("updated_at"))?,
    })
}

fn folder_from_row(row: &SqliteRow) -> Result<ReportFolder, StoreError> {
    let company: String = row.get("company");
    let role_required: String = row.get("role_required");

    Ok(ReportFolder {
        id: row.get("id"),
        name: row.get("name"),
        path_prefix: row.get("path_prefix"),
        company: company
            .parse::<Company>()
            .map_err(StoreError::Backend)?,
        role_required: role_required.parse::<Role>().map_err(StoreError::Backend)?,
        created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
    })
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    raw.parse::<DateTime<Utc>>()
        .map_err(|e| StoreError::Backend(format!("bad timestamp '{}': {}", raw, e)))
}
