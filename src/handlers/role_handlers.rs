use actix_web::{HttpResponse, web};
use sqlx::SqlitePool;

use crate::auth::validate::{into_result, validate_optional, validate_required, validate_role_name};
use crate::errors::AppError;
use crate::models::role::{self, NewRole, RoleUpdate};
use crate::response::{acknowledged, success};

/// GET /api/roles: every role with its granted permissions.
pub async fn list(pool: web::Data<SqlitePool>) -> Result<HttpResponse, AppError> {
    let roles = role::find_all_with_permissions(&pool).await?;
    let total = roles.len();
    Ok(success(serde_json::json!({ "roles": roles, "total": total })))
}

/// GET /api/roles/{id}
pub async fn read(pool: web::Data<SqlitePool>, path: web::Path<i64>) -> Result<HttpResponse, AppError> {
    let found = role::find_by_id(&pool, path.into_inner())
        .await?
        .ok_or(AppError::NotFound("role"))?;
    Ok(success(role::with_permissions(&pool, found).await?))
}

/// POST /api/roles
pub async fn create(pool: web::Data<SqlitePool>, body: web::Json<NewRole>) -> Result<HttpResponse, AppError> {
    let mut errors = Vec::new();
    errors.extend(validate_role_name(&body.name));
    errors.extend(validate_required(&body.display_name, "Display name", 100));
    errors.extend(validate_optional(&body.description, "Description", 500));
    into_result(errors)?;

    let id = role::create(&pool, &body).await?;
    log::info!("created role '{}' ({id})", body.name.trim());

    let created = role::find_by_id(&pool, id).await?.ok_or(AppError::NotFound("role"))?;
    Ok(success(role::with_permissions(&pool, created).await?))
}

/// PUT /api/roles/{id}
pub async fn update(
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    body: web::Json<RoleUpdate>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let mut errors = Vec::new();
    errors.extend(validate_required(&body.display_name, "Display name", 100));
    errors.extend(validate_optional(&body.description, "Description", 500));
    into_result(errors)?;

    if !role::update(&pool, id, &body).await? {
        return Err(AppError::NotFound("role"));
    }
    let found = role::find_by_id(&pool, id).await?.ok_or(AppError::NotFound("role"))?;
    Ok(success(role::with_permissions(&pool, found).await?))
}

/// DELETE /api/roles/{id}. Reserved roles are refused.
pub async fn delete(pool: web::Data<SqlitePool>, path: web::Path<i64>) -> Result<HttpResponse, AppError> {
    role::delete(&pool, path.into_inner()).await?;
    Ok(acknowledged("Role deleted"))
}
