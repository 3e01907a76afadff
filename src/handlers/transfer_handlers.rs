use actix_web::{HttpResponse, http::header, web};
use chrono::Utc;
use sqlx::SqlitePool;

use crate::errors::AppError;
use crate::response::success;
use crate::transfer;

fn csv_download(kind: &str, body: Vec<u8>) -> HttpResponse {
    let stamp = Utc::now().format("%Y%m%d_%H%M%S");
    HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{kind}_{stamp}.csv\""),
        ))
        .body(body)
}

/// GET /api/export/users
pub async fn export_users(pool: web::Data<SqlitePool>) -> Result<HttpResponse, AppError> {
    Ok(csv_download("users", transfer::users_csv(&pool).await?))
}

/// GET /api/export/roles
pub async fn export_roles(pool: web::Data<SqlitePool>) -> Result<HttpResponse, AppError> {
    Ok(csv_download("roles", transfer::roles_csv(&pool).await?))
}

/// GET /api/export/permissions
pub async fn export_permissions(pool: web::Data<SqlitePool>) -> Result<HttpResponse, AppError> {
    Ok(csv_download("permissions", transfer::permissions_csv(&pool).await?))
}

// Imports take the CSV document as the raw request body.

/// POST /api/import/users
pub async fn import_users(pool: web::Data<SqlitePool>, body: web::Bytes) -> Result<HttpResponse, AppError> {
    Ok(success(transfer::import_users(&pool, &body).await?))
}

/// POST /api/import/roles
pub async fn import_roles(pool: web::Data<SqlitePool>, body: web::Bytes) -> Result<HttpResponse, AppError> {
    Ok(success(transfer::import_roles(&pool, &body).await?))
}

/// POST /api/import/permissions
pub async fn import_permissions(pool: web::Data<SqlitePool>, body: web::Bytes) -> Result<HttpResponse, AppError> {
    Ok(success(transfer::import_permissions(&pool, &body).await?))
}
