use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use sqlx::SqlitePool;

use crate::errors::AppError;

/// A validated `<resource>.<action>` permission key.
///
/// Both segments are non-empty lowercase ASCII words (`[a-z0-9_]`), so a typo
/// cannot produce a key outside that shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PermissionName(Cow<'static, str>);

fn valid_segment(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

const fn valid_static(name: &str) -> bool {
    let bytes = name.as_bytes();
    let mut dots = 0;
    let mut segment_len = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'.' => {
                if segment_len == 0 {
                    return false;
                }
                dots += 1;
                segment_len = 0;
            }
            b'a'..=b'z' | b'0'..=b'9' | b'_' => segment_len += 1,
            _ => return false,
        }
        i += 1;
    }
    dots == 1 && segment_len > 0
}

pub const USER_READ: PermissionName = PermissionName::from_static("user.read");
pub const USER_WRITE: PermissionName = PermissionName::from_static("user.write");
pub const ROLE_READ: PermissionName = PermissionName::from_static("role.read");
pub const ROLE_WRITE: PermissionName = PermissionName::from_static("role.write");
pub const PERMISSION_READ: PermissionName = PermissionName::from_static("permission.read");
pub const PERMISSION_WRITE: PermissionName = PermissionName::from_static("permission.write");

impl PermissionName {
    /// For names fixed at compile time. A malformed name fails the build when
    /// used in a `const`.
    pub const fn from_static(name: &'static str) -> Self {
        assert!(valid_static(name), "permission names look like <resource>.<action>");
        PermissionName(Cow::Borrowed(name))
    }

    pub fn new(resource: &str, action: &str) -> Result<Self, AppError> {
        if !valid_segment(resource) || !valid_segment(action) {
            return Err(AppError::Validation(format!(
                "invalid permission '{resource}.{action}': resource and action must be lowercase words"
            )));
        }
        Ok(PermissionName(Cow::Owned(format!("{resource}.{action}"))))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn resource(&self) -> &str {
        self.0.split_once('.').map(|(r, _)| r).unwrap_or_default()
    }

    pub fn action(&self) -> &str {
        self.0.split_once('.').map(|(_, a)| a).unwrap_or_default()
    }
}

impl FromStr for PermissionName {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('.') {
            Some((resource, action)) => PermissionName::new(resource, action),
            None => Err(AppError::Validation(format!(
                "invalid permission '{s}': expected <resource>.<action>"
            ))),
        }
    }
}

impl fmt::Display for PermissionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Permission {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub resource: String,
    pub action: String,
    pub description: String,
    pub created_at: String,
}

/// The authorization vocabulary seeded at first boot: (resource, action, display name, description).
pub const DEFAULT_PERMISSIONS: &[(&str, &str, &str, &str)] = &[
    ("user", "read", "View users", "List and view user accounts"),
    ("user", "write", "Manage users", "Create and edit user accounts"),
    ("user", "delete", "Delete users", "Delete user accounts"),
    ("role", "read", "View roles", "List and view roles"),
    ("role", "write", "Manage roles", "Create and edit roles"),
    ("role", "delete", "Delete roles", "Delete roles"),
    ("permission", "read", "View permissions", "View permission configuration"),
    ("permission", "write", "Configure permissions", "Assign permissions to roles"),
    ("system", "read", "View system", "View system information"),
    ("system", "write", "Manage system", "Manage system configuration"),
];

pub const SELECT_PERMISSION: &str =
    "SELECT p.id, p.name, p.display_name, p.resource, p.action, p.description, p.created_at \
     FROM permissions p";

pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Permission>, sqlx::Error> {
    sqlx::query_as::<_, Permission>(&format!("{SELECT_PERMISSION} ORDER BY p.resource, p.id"))
        .fetch_all(pool)
        .await
}

/// Insert a new permission. A duplicate name is a `Conflict`.
pub async fn create(
    pool: &SqlitePool,
    name: &PermissionName,
    display_name: &str,
    description: &str,
) -> Result<i64, AppError> {
    let result = sqlx::query(
        "INSERT INTO permissions (name, display_name, resource, action, description) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(name.as_str())
    .bind(display_name)
    .bind(name.resource())
    .bind(name.action())
    .bind(description)
    .execute(pool)
    .await
    .map_err(|e| {
        if crate::models::is_unique_violation(&e) {
            AppError::Conflict(format!("permission '{name}' already exists"))
        } else {
            AppError::Db(e)
        }
    })?;
    Ok(result.last_insert_rowid())
}

/// Insert a permission unless one with the same name exists. Returns its id either way.
pub async fn ensure(
    pool: &SqlitePool,
    name: &PermissionName,
    display_name: &str,
    description: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query(
        "INSERT OR IGNORE INTO permissions (name, display_name, resource, action, description) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(name.as_str())
    .bind(display_name)
    .bind(name.resource())
    .bind(name.action())
    .bind(description)
    .execute(pool)
    .await?;

    sqlx::query_scalar("SELECT id FROM permissions WHERE name = ?")
        .bind(name.as_str())
        .fetch_one(pool)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_from_resource_and_action() {
        let name = PermissionName::new("user", "write").expect("valid");
        assert_eq!(name.as_str(), "user.write");
        assert_eq!(name.resource(), "user");
        assert_eq!(name.action(), "write");
    }

    #[test]
    fn parse_round_trips_through_display() {
        let name: PermissionName = "role.delete".parse().expect("valid");
        assert_eq!(name.to_string(), "role.delete");
    }

    #[test]
    fn malformed_names_are_rejected() {
        for bad in ["user", "user.", ".write", "User.write", "user.write.all", "user write", ""] {
            assert!(bad.parse::<PermissionName>().is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn static_names_equal_parsed_ones() {
        let parsed: PermissionName = "permission.write".parse().expect("valid");
        assert_eq!(PERMISSION_WRITE, parsed);
        assert_eq!(USER_READ.resource(), "user");
        assert!(!valid_static("user"));
        assert!(!valid_static("user.write.all"));
        assert!(!valid_static("User.write"));
    }

    #[test]
    fn defaults_are_all_valid() {
        for (resource, action, _, _) in DEFAULT_PERMISSIONS {
            assert!(PermissionName::new(resource, action).is_ok());
        }
    }
}
