use serde::{Deserialize, Serialize};

use crate::models::permission::Permission;

/// Roles seeded at first boot that may never be deleted.
pub const RESERVED_ROLES: [&str; 3] = ["super_admin", "admin", "user"];

pub fn is_reserved(name: &str) -> bool {
    RESERVED_ROLES.contains(&name)
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub status: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// A role together with the permissions granted to it.
#[derive(Debug, Clone, Serialize)]
pub struct RoleWithPermissions {
    #[serde(flatten)]
    pub role: Role,
    pub permissions: Vec<Permission>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewRole {
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_true")]
    pub status: bool,
}

/// Editable role fields; the machine name is fixed once created.
#[derive(Debug, Clone, Deserialize)]
pub struct RoleUpdate {
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_true")]
    pub status: bool,
}
