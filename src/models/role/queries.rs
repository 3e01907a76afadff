use sqlx::SqlitePool;

use super::types::{NewRole, Role, RoleUpdate, RoleWithPermissions, is_reserved};
use crate::errors::AppError;
use crate::models::{is_unique_violation, rbac};

const SELECT_ROLE: &str =
    "SELECT r.id, r.name, r.display_name, r.description, r.status, r.created_at, r.updated_at \
     FROM roles r";

pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Role>, sqlx::Error> {
    sqlx::query_as::<_, Role>(&format!("{SELECT_ROLE} ORDER BY r.id"))
        .fetch_all(pool)
        .await
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Role>, sqlx::Error> {
    sqlx::query_as::<_, Role>(&format!("{SELECT_ROLE} WHERE r.id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_name(pool: &SqlitePool, name: &str) -> Result<Option<Role>, sqlx::Error> {
    sqlx::query_as::<_, Role>(&format!("{SELECT_ROLE} WHERE r.name = ?"))
        .bind(name)
        .fetch_optional(pool)
        .await
}

/// Roles linked to a user, active or not.
pub async fn find_by_user(pool: &SqlitePool, user_id: i64) -> Result<Vec<Role>, sqlx::Error> {
    sqlx::query_as::<_, Role>(&format!(
        "{SELECT_ROLE} JOIN user_roles ur ON ur.role_id = r.id WHERE ur.user_id = ? ORDER BY r.id"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn with_permissions(pool: &SqlitePool, role: Role) -> Result<RoleWithPermissions, sqlx::Error> {
    let permissions = rbac::permissions_of_role(pool, role.id).await?;
    Ok(RoleWithPermissions { role, permissions })
}

pub async fn find_all_with_permissions(pool: &SqlitePool) -> Result<Vec<RoleWithPermissions>, sqlx::Error> {
    let mut out = Vec::new();
    for role in find_all(pool).await? {
        out.push(with_permissions(pool, role).await?);
    }
    Ok(out)
}

/// Create a role. A duplicate name is a `Conflict`.
pub async fn create(pool: &SqlitePool, new: &NewRole) -> Result<i64, AppError> {
    let result = sqlx::query(
        "INSERT INTO roles (name, display_name, description, status) VALUES (?, ?, ?, ?)",
    )
    .bind(new.name.trim())
    .bind(new.display_name.trim())
    .bind(new.description.trim())
    .bind(new.status)
    .execute(pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(format!("role '{}' already exists", new.name.trim()))
        } else {
            AppError::Db(e)
        }
    })?;
    Ok(result.last_insert_rowid())
}

/// Returns false when no such role exists.
pub async fn update(pool: &SqlitePool, id: i64, upd: &RoleUpdate) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE roles SET display_name = ?, description = ?, status = ?, \
             updated_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now') \
         WHERE id = ?",
    )
    .bind(upd.display_name.trim())
    .bind(upd.description.trim())
    .bind(upd.status)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Delete a role and, through the cascade, its grants and user links.
/// Reserved roles are refused and left untouched.
pub async fn delete(pool: &SqlitePool, id: i64) -> Result<(), AppError> {
    let role = find_by_id(pool, id).await?.ok_or(AppError::NotFound("role"))?;
    if is_reserved(&role.name) {
        return Err(AppError::ReservedRole(role.name));
    }

    let result = sqlx::query("DELETE FROM roles WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("role"));
    }
    log::info!("deleted role '{}' ({})", role.name, id);
    Ok(())
}

/// Insert a role unless one with the same name exists. Returns its id and whether it was created.
pub async fn ensure(pool: &SqlitePool, new: &NewRole) -> Result<(i64, bool), sqlx::Error> {
    let inserted = sqlx::query(
        "INSERT OR IGNORE INTO roles (name, display_name, description, status) VALUES (?, ?, ?, ?)",
    )
    .bind(&new.name)
    .bind(&new.display_name)
    .bind(&new.description)
    .bind(new.status)
    .execute(pool)
    .await?
    .rows_affected()
        > 0;

    let id: i64 = sqlx::query_scalar("SELECT id FROM roles WHERE name = ?")
        .bind(&new.name)
        .fetch_one(pool)
        .await?;
    Ok((id, inserted))
}
