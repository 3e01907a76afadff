use std::sync::OnceLock;
use std::time::Instant;

use actix_web::{HttpResponse, web};
use sqlx::SqlitePool;

use crate::errors::AppError;
use crate::models::{monitor, setting, user};
use crate::response::{ApiResponse, success};

static STARTED_AT: OnceLock<Instant> = OnceLock::new();

/// First call pins the process start used for uptime; later calls read it.
pub fn started_at() -> Instant {
    *STARTED_AT.get_or_init(Instant::now)
}

/// GET /health: liveness plus a round trip to the store.
pub async fn health(pool: web::Data<SqlitePool>) -> HttpResponse {
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool.get_ref()).await {
        Ok(_) => success(serde_json::json!({ "status": "ok", "database": "ok" })),
        Err(e) => {
            log::error!("health check failed: {e}");
            HttpResponse::ServiceUnavailable().json(ApiResponse {
                code: 503,
                message: "database unavailable".to_string(),
                data: Some(serde_json::json!({ "status": "degraded", "database": "error" })),
            })
        }
    }
}

/// GET /api/system/info
pub async fn info(pool: web::Data<SqlitePool>) -> Result<HttpResponse, AppError> {
    let user_count = user::count(&pool).await?;
    let version = setting::get_value(&pool, "system_version", env!("CARGO_PKG_VERSION")).await?;
    Ok(success(serde_json::json!({
        "user_count": user_count,
        "database": "sqlite",
        "version": version,
        "server_version": env!("CARGO_PKG_VERSION"),
    })))
}

/// GET /api/system/monitor: public counters for status pages.
pub async fn monitor(pool: web::Data<SqlitePool>) -> Result<HttpResponse, AppError> {
    let snapshot = monitor::snapshot(&pool, started_at().elapsed()).await?;
    Ok(success(snapshot))
}
