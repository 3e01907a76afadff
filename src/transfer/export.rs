use csv::Writer;
use sqlx::SqlitePool;

use super::types::{PERMISSION_COLUMNS, ROLE_COLUMNS, USER_COLUMNS, status_label};
use crate::errors::AppError;
use crate::models::{permission, role, user};

fn write_csv<const N: usize>(
    header: [&str; N],
    rows: impl IntoIterator<Item = [String; N]>,
) -> Result<Vec<u8>, AppError> {
    let mut writer = Writer::from_writer(Vec::new());
    writer
        .write_record(header)
        .map_err(|e| AppError::Internal(format!("csv write: {e}")))?;
    for row in rows {
        writer
            .write_record(&row)
            .map_err(|e| AppError::Internal(format!("csv write: {e}")))?;
    }
    writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("csv flush: {e}")))
}

/// Every account, without password hashes.
pub async fn users_csv(pool: &SqlitePool) -> Result<Vec<u8>, AppError> {
    let users = user::find_all(pool).await?;
    write_csv(
        USER_COLUMNS,
        users.into_iter().map(|u| {
            [
                u.id.to_string(),
                u.username,
                u.email,
                u.role,
                status_label(u.status).to_string(),
                u.real_name,
                u.phone,
                u.department,
                u.position,
                u.bio,
                u.last_login.unwrap_or_default(),
                u.created_at,
            ]
        }),
    )
}

pub async fn roles_csv(pool: &SqlitePool) -> Result<Vec<u8>, AppError> {
    let roles = role::find_all(pool).await?;
    write_csv(
        ROLE_COLUMNS,
        roles.into_iter().map(|r| {
            [
                r.id.to_string(),
                r.name,
                r.display_name,
                r.description,
                status_label(r.status).to_string(),
                r.created_at,
            ]
        }),
    )
}

pub async fn permissions_csv(pool: &SqlitePool) -> Result<Vec<u8>, AppError> {
    let permissions = permission::find_all(pool).await?;
    write_csv(
        PERMISSION_COLUMNS,
        permissions.into_iter().map(|p| {
            [
                p.id.to_string(),
                p.name,
                p.display_name,
                p.resource,
                p.action,
                p.description,
                p.created_at,
            ]
        }),
    )
}
