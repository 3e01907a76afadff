use std::collections::BTreeMap;

use actix_web::{HttpResponse, web};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::auth::validate::{into_result, validate_optional, validate_required};
use crate::errors::AppError;
use crate::models::setting::{self, NewConfig, SystemConfig};
use crate::response::{acknowledged, success};

#[derive(Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateValueRequest {
    pub value: String,
}

#[derive(Deserialize)]
pub struct BatchUpdateRequest {
    pub configs: BTreeMap<String, String>,
}

/// GET /api/config/public, no authentication.
pub async fn public(pool: web::Data<SqlitePool>) -> Result<HttpResponse, AppError> {
    Ok(success(setting::public_map(&pool).await?))
}

/// GET /api/config?category=
pub async fn list(pool: web::Data<SqlitePool>, query: web::Query<ListQuery>) -> Result<HttpResponse, AppError> {
    let category = query.category.as_deref().filter(|c| !c.is_empty());
    let configs = setting::find_all(&pool, category).await?;

    let mut grouped: BTreeMap<&str, Vec<&SystemConfig>> = BTreeMap::new();
    for c in &configs {
        grouped.entry(c.category.as_str()).or_default().push(c);
    }
    Ok(success(serde_json::json!({
        "configs": configs,
        "grouped": grouped,
        "total": configs.len(),
    })))
}

/// GET /api/config/{key}
pub async fn read(pool: web::Data<SqlitePool>, path: web::Path<String>) -> Result<HttpResponse, AppError> {
    let found = setting::find_by_key(&pool, &path)
        .await?
        .ok_or(AppError::NotFound("config"))?;
    Ok(success(found))
}

/// PUT /api/config/{key}
pub async fn update(
    pool: web::Data<SqlitePool>,
    path: web::Path<String>,
    body: web::Json<UpdateValueRequest>,
) -> Result<HttpResponse, AppError> {
    let updated = setting::update_value(&pool, &path, &body.value).await?;
    log::info!("config '{}' updated", updated.key);
    Ok(success(updated))
}

/// POST /api/config/batch: all entries or none.
pub async fn batch_update(
    pool: web::Data<SqlitePool>,
    body: web::Json<BatchUpdateRequest>,
) -> Result<HttpResponse, AppError> {
    let updated = setting::batch_update(&pool, &body.configs).await?;
    Ok(success(serde_json::json!({
        "message": "Configs updated",
        "updated": updated,
    })))
}

/// POST /api/config
pub async fn create(pool: web::Data<SqlitePool>, body: web::Json<NewConfig>) -> Result<HttpResponse, AppError> {
    let mut errors = Vec::new();
    errors.extend(validate_required(&body.key, "Key", 100));
    errors.extend(validate_required(&body.category, "Category", 50));
    errors.extend(validate_required(&body.display_name, "Display name", 100));
    errors.extend(validate_optional(&body.description, "Description", 500));
    into_result(errors)?;

    let created = setting::create(&pool, &body).await?;
    log::info!("config '{}' created", created.key);
    Ok(success(created))
}

/// DELETE /api/config/{key}
pub async fn delete(pool: web::Data<SqlitePool>, path: web::Path<String>) -> Result<HttpResponse, AppError> {
    setting::delete(&pool, &path).await?;
    Ok(acknowledged("Config deleted"))
}

/// POST /api/config/{key}/reset
pub async fn reset(pool: web::Data<SqlitePool>, path: web::Path<String>) -> Result<HttpResponse, AppError> {
    let restored = setting::reset_to_default(&pool, &path).await?;
    Ok(success(serde_json::json!({
        "message": "Config reset to default",
        "config": restored,
    })))
}
