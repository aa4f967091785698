//! Core data type definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Capability flag name for report viewing
pub const CAN_VIEW_REPORTS: &str = "can_view_reports";
/// Capability flag name for the user management screens
pub const CAN_VIEW_USER_MANAGEMENT: &str = "can_view_user_management";

/// Companies known to the system
///
/// The folder catalog and every permission record are scoped to exactly one
/// company; there is no cross-company visibility at any role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Company {
    CompanyA,
    CompanyB,
}

impl std::fmt::Display for Company {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Company::CompanyA => write!(f, "CompanyA"),
            Company::CompanyB => write!(f, "CompanyB"),
        }
    }
}

impl std::str::FromStr for Company {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CompanyA" => Ok(Company::CompanyA),
            "CompanyB" => Ok(Company::CompanyB),
            _ => Err(format!("Unknown company: {}", s)),
        }
    }
}

/// User roles, ordered from widest to narrowest visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Sees every folder of the company and may download any key
    Admin,
    /// Sees Regional and LocalUnit folders
    Regional,
    /// Sees only LocalUnit folders
    LocalUnit,
}

impl Role {
    /// Whether a caller with this role may see a folder gated at `required`
    pub fn can_access(self, required: Role) -> bool {
        match self {
            Role::Admin => true,
            Role::Regional => matches!(required, Role::Regional | Role::LocalUnit),
            Role::LocalUnit => required == Role::LocalUnit,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "Admin"),
            Role::Regional => write!(f, "Regional"),
            Role::LocalUnit => write!(f, "LocalUnit"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Admin" => Ok(Role::Admin),
            "Regional" => Ok(Role::Regional),
            "LocalUnit" => Ok(Role::LocalUnit),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// Local permission record, joined to the identity provider's user by
/// `remote_identity_id`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    /// Provider-side user id; unique and immutable once set
    pub remote_identity_id: String,
    pub email: String,
    pub company: Company,
    pub role: Role,
    pub can_view_reports: bool,
    pub can_view_user_management: bool,
    /// Soft-delete flag; false means deactivated
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for creating a new permission record
#[derive(Debug, Clone, Deserialize)]
pub struct NewProfile {
    pub remote_identity_id: String,
    pub email: String,
    pub company: Company,
    pub role: Role,
    pub can_view_reports: bool,
    pub can_view_user_management: bool,
}

/// Partial update of a permission record; `None` fields are left untouched
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub company: Option<Company>,
    pub role: Option<Role>,
    pub can_view_reports: Option<bool>,
    pub can_view_user_management: Option<bool>,
    pub is_active: Option<bool>,
}

/// Generic local identity row created lazily by the gateway (username = email)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalUser {
    pub id: i64,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// A configured prefix boundary in the blob store, gated by company and
/// minimum role
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportFolder {
    pub id: i64,
    /// Display name for this category (e.g. "Sales")
    pub name: String,
    /// Folder path in the bucket (e.g. "company-a/sales/"); acts as a
    /// directory boundary and should end with '/'
    pub path_prefix: String,
    pub company: Company,
    pub role_required: Role,
    pub created_at: DateTime<Utc>,
}

/// Fields for creating a folder catalog entry
#[derive(Debug, Clone, Deserialize)]
pub struct NewFolder {
    pub name: String,
    pub path_prefix: String,
    pub company: Company,
    pub role_required: Role,
}

/// One object entry returned by the blob store listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub key: String,
    pub size: i64,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Identity record returned by the provider when a token verifies
#[derive(Debug, Clone, Deserialize)]
pub struct VerifiedIdentity {
    pub id: String,
    pub email: String,
}

/// Company/role attributes from the provider-hosted profile table
///
/// Both fields are free-form strings: the provider row is not constrained
/// to our enums, so parsing happens at authorization time.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteProfile {
    pub company: Option<String>,
    pub role: Option<String>,
}
