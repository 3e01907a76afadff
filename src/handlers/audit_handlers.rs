use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::errors::AppError;
use crate::models::operation_log::{self, LogFilter, RETENTION_DAYS};
use crate::response::{Page, acknowledged, success};

#[derive(Deserialize)]
pub struct LogQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub username: Option<String>,
    pub action: Option<String>,
    pub resource: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Deserialize)]
pub struct BatchDeleteRequest {
    pub ids: Vec<i64>,
}

fn parse_date(value: Option<&str>, field: &str) -> Result<Option<NaiveDate>, AppError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => NaiveDate::parse_from_str(v, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| AppError::Validation(format!("{field} must be a date in YYYY-MM-DD form"))),
    }
}

/// GET /api/logs
pub async fn list(pool: web::Data<SqlitePool>, query: web::Query<LogQuery>) -> Result<HttpResponse, AppError> {
    let page = query.page.unwrap_or(1).max(1);
    let page_size = query.page_size.unwrap_or(20).clamp(1, 100);
    let filter = LogFilter {
        username: query.username.clone(),
        action: query.action.clone(),
        resource: query.resource.clone(),
        start_date: parse_date(query.start_date.as_deref(), "start_date")?,
        end_date: parse_date(query.end_date.as_deref(), "end_date")?,
    };

    let (entries, total) = operation_log::find_paginated(&pool, &filter, page, page_size).await?;
    Ok(success(Page::new(entries, total, page, page_size)))
}

/// GET /api/logs/{id}
pub async fn read(pool: web::Data<SqlitePool>, path: web::Path<i64>) -> Result<HttpResponse, AppError> {
    let entry = operation_log::find_by_id(&pool, path.into_inner())
        .await?
        .ok_or(AppError::NotFound("log entry"))?;
    Ok(success(entry))
}

/// DELETE /api/logs/{id}
pub async fn delete(pool: web::Data<SqlitePool>, path: web::Path<i64>) -> Result<HttpResponse, AppError> {
    if !operation_log::delete(&pool, path.into_inner()).await? {
        return Err(AppError::NotFound("log entry"));
    }
    Ok(acknowledged("Log entry deleted"))
}

/// POST /api/logs/batch-delete
pub async fn batch_delete(
    pool: web::Data<SqlitePool>,
    body: web::Json<BatchDeleteRequest>,
) -> Result<HttpResponse, AppError> {
    if body.ids.is_empty() {
        return Err(AppError::Validation("ids must not be empty".to_string()));
    }
    let deleted = operation_log::delete_many(&pool, &body.ids).await?;
    Ok(success(serde_json::json!({
        "message": "Log entries deleted",
        "deleted": deleted,
    })))
}

/// DELETE /api/logs/clear-old
pub async fn clear_old(pool: web::Data<SqlitePool>) -> Result<HttpResponse, AppError> {
    let deleted = operation_log::delete_older_than(&pool, RETENTION_DAYS).await?;
    log::info!("cleared {deleted} operation log entries older than {RETENTION_DAYS} days");
    Ok(success(serde_json::json!({
        "message": "Old log entries cleared",
        "deleted": deleted,
    })))
}

/// GET /api/logs/stats
pub async fn stats(pool: web::Data<SqlitePool>) -> Result<HttpResponse, AppError> {
    Ok(success(operation_log::stats(&pool).await?))
}
