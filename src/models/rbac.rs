//! The authorization graph: users link to roles, roles link to permissions.
//!
//! A user holds a permission when at least one *active* role linked to the
//! user carries it. Inactive roles stay linked but grant nothing.

use std::collections::BTreeSet;

use sqlx::{Sqlite, SqlitePool};

use crate::errors::AppError;
use crate::models::permission::{Permission, PermissionName, SELECT_PERMISSION};

pub async fn user_has_permission(
    pool: &SqlitePool,
    user_id: i64,
    permission: &PermissionName,
) -> Result<bool, sqlx::Error> {
    let n: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM user_roles ur \
         JOIN roles r ON r.id = ur.role_id \
         JOIN role_permissions rp ON rp.role_id = r.id \
         JOIN permissions p ON p.id = rp.permission_id \
         WHERE ur.user_id = ? AND r.status = 1 AND p.name = ?",
    )
    .bind(user_id)
    .bind(permission.as_str())
    .fetch_one(pool)
    .await?;
    Ok(n > 0)
}

/// Effective permissions of a user, de-duplicated across roles.
pub async fn permissions_of(pool: &SqlitePool, user_id: i64) -> Result<Vec<Permission>, sqlx::Error> {
    sqlx::query_as::<_, Permission>(&format!(
        "{SELECT_PERMISSION} WHERE p.id IN ( \
             SELECT rp.permission_id FROM user_roles ur \
             JOIN roles r ON r.id = ur.role_id \
             JOIN role_permissions rp ON rp.role_id = r.id \
             WHERE ur.user_id = ? AND r.status = 1) \
         ORDER BY p.id"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn permissions_of_role(pool: &SqlitePool, role_id: i64) -> Result<Vec<Permission>, sqlx::Error> {
    sqlx::query_as::<_, Permission>(&format!(
        "{SELECT_PERMISSION} JOIN role_permissions rp ON rp.permission_id = p.id \
         WHERE rp.role_id = ? ORDER BY p.id"
    ))
    .bind(role_id)
    .fetch_all(pool)
    .await
}

/// Replace the full set of roles linked to a user.
///
/// Runs in one transaction: either the new set is stored in full or the old
/// one stays. Ids that name no role are skipped. Returns the role ids that
/// ended up linked, in ascending order.
pub async fn assign_roles(pool: &SqlitePool, user_id: i64, role_ids: &[i64]) -> Result<Vec<i64>, AppError> {
    let mut tx = pool.begin().await?;

    let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;
    if exists.is_none() {
        return Err(AppError::NotFound("user"));
    }

    sqlx::query("DELETE FROM user_roles WHERE user_id = ?")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    let mut linked = Vec::new();
    for role_id in role_ids.iter().copied().collect::<BTreeSet<_>>() {
        let inserted = sqlx::query("INSERT INTO user_roles (user_id, role_id) SELECT ?, id FROM roles WHERE id = ?")
            .bind(user_id)
            .bind(role_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if inserted > 0 {
            linked.push(role_id);
        }
    }

    tx.commit().await?;
    log::info!("user {user_id} now holds roles {linked:?}");
    Ok(linked)
}

/// Replace the full set of permissions granted to a role. Same contract as [`assign_roles`].
pub async fn assign_permissions(
    pool: &SqlitePool,
    role_id: i64,
    permission_ids: &[i64],
) -> Result<Vec<i64>, AppError> {
    let mut tx = pool.begin().await?;

    let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM roles WHERE id = ?")
        .bind(role_id)
        .fetch_optional(&mut *tx)
        .await?;
    if exists.is_none() {
        return Err(AppError::NotFound("role"));
    }

    sqlx::query("DELETE FROM role_permissions WHERE role_id = ?")
        .bind(role_id)
        .execute(&mut *tx)
        .await?;

    let mut granted = Vec::new();
    for permission_id in permission_ids.iter().copied().collect::<BTreeSet<_>>() {
        let inserted = sqlx::query(
            "INSERT INTO role_permissions (role_id, permission_id) SELECT ?, id FROM permissions WHERE id = ?",
        )
        .bind(role_id)
        .bind(permission_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if inserted > 0 {
            granted.push(permission_id);
        }
    }

    tx.commit().await?;
    log::info!("role {role_id} now grants permissions {granted:?}");
    Ok(granted)
}

/// Add a single grant if absent. Used by seeding.
pub async fn grant(pool: &SqlitePool, role_id: i64, permission_id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT OR IGNORE INTO role_permissions (role_id, permission_id) VALUES (?, ?)")
        .bind(role_id)
        .bind(permission_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Add a single user-role link if absent. Used when an account is created.
pub async fn link_role<'e, E>(executor: E, user_id: i64, role_id: i64) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query("INSERT OR IGNORE INTO user_roles (user_id, role_id) VALUES (?, ?)")
        .bind(user_id)
        .bind(role_id)
        .execute(executor)
        .await?;
    Ok(())
}
