use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

use crate::auth::password::hash_password;
use crate::errors::AppError;
use crate::models::permission::{self, DEFAULT_PERMISSIONS, PermissionName};
use crate::models::role::{self, NewRole};
use crate::models::user::{self, NewUser, ProfileFields};
use crate::models::{rbac, setting};

pub const ADMIN_USERNAME: &str = "admin";
const ADMIN_EMAIL: &str = "admin@example.com";

pub async fn init_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal);
    SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await
}

/// A private in-memory database on a single connection that is never recycled.
pub async fn connect_in_memory() -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!().run(pool).await?;
    log::info!("Database migrations complete");
    Ok(())
}

/// Grants of the reserved roles: (role, display name, description, permissions).
/// `None` grants every permission.
const RESERVED_ROLE_SEED: &[(&str, &str, &str, Option<&[&str]>)] = &[
    ("super_admin", "Super administrator", "Holds every permission", None),
    (
        "admin",
        "Administrator",
        "Manages users and views the system",
        Some(&["user.read", "user.write", "user.delete", "system.read"]),
    ),
    ("user", "User", "Regular account", Some(&["user.read"])),
];

/// Insert the default permissions, reserved roles with their grants, system
/// configuration and the `admin` account. Existing rows are left untouched.
pub async fn seed(pool: &SqlitePool, admin_password: &str) -> Result<(), AppError> {
    let mut permission_ids = Vec::new();
    for (resource, action, display_name, description) in DEFAULT_PERMISSIONS {
        let name = PermissionName::new(resource, action)?;
        let id = permission::ensure(pool, &name, display_name, description).await?;
        permission_ids.push((name, id));
    }

    let mut super_admin_id = None;
    for (name, display_name, description, grants) in RESERVED_ROLE_SEED {
        let new = NewRole {
            name: name.to_string(),
            display_name: display_name.to_string(),
            description: description.to_string(),
            status: true,
        };
        let (role_id, created) = role::ensure(pool, &new).await?;
        if *name == "super_admin" {
            super_admin_id = Some(role_id);
        }
        // Grants are only laid down once so that later edits survive restarts.
        if !created {
            continue;
        }
        for (perm, perm_id) in &permission_ids {
            if grants.is_none_or(|g| g.contains(&perm.as_str())) {
                rbac::grant(pool, role_id, *perm_id).await?;
            }
        }
        log::info!("Seeded role '{name}'");
    }

    let configs = setting::seed_defaults(pool).await?;
    if configs > 0 {
        log::info!("Seeded {configs} system config entries");
    }

    if user::find_by_username(pool, ADMIN_USERNAME).await?.is_none() {
        let admin = NewUser {
            username: ADMIN_USERNAME.to_string(),
            email: ADMIN_EMAIL.to_string(),
            password: hash_password(admin_password)?,
            role: "admin".to_string(),
            status: true,
            profile: ProfileFields {
                real_name: "Administrator".to_string(),
                ..ProfileFields::default()
            },
        };
        let mut tx = pool.begin().await?;
        let id = user::create(&mut *tx, &admin).await?;
        if let Some(role_id) = super_admin_id {
            rbac::link_role(&mut *tx, id, role_id).await?;
        }
        tx.commit().await?;
        log::info!("Created default admin account");
    }

    Ok(())
}
