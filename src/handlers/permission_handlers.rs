use std::collections::BTreeMap;

use actix_web::{HttpResponse, web};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::errors::AppError;
use crate::models::permission::{self, Permission};
use crate::models::{rbac, role};
use crate::response::success;

#[derive(Deserialize)]
pub struct AssignPermissionsRequest {
    pub role_id: i64,
    #[serde(default)]
    pub permission_ids: Vec<i64>,
}

/// GET /api/permissions: flat list plus the same permissions grouped by resource.
pub async fn list(pool: web::Data<SqlitePool>) -> Result<HttpResponse, AppError> {
    let permissions = permission::find_all(&pool).await?;
    let mut grouped: BTreeMap<&str, Vec<&Permission>> = BTreeMap::new();
    for p in &permissions {
        grouped.entry(p.resource.as_str()).or_default().push(p);
    }
    Ok(success(serde_json::json!({
        "permissions": permissions,
        "grouped": grouped,
        "total": permissions.len(),
    })))
}

/// POST /api/permissions/assign: replace a role's whole permission set.
pub async fn assign(
    pool: web::Data<SqlitePool>,
    body: web::Json<AssignPermissionsRequest>,
) -> Result<HttpResponse, AppError> {
    rbac::assign_permissions(&pool, body.role_id, &body.permission_ids).await?;
    let updated = role::find_by_id(&pool, body.role_id)
        .await?
        .ok_or(AppError::NotFound("role"))?;
    let updated = role::with_permissions(&pool, updated).await?;
    Ok(success(serde_json::json!({
        "message": "Permissions assigned",
        "role": updated,
    })))
}
