//! Live counters for the public system monitor.

use chrono::{Duration, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

use super::operation_log::{count_since, day_start, timestamp};

/// Accounts that signed in within this many days count as active.
pub const ACTIVE_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, Serialize)]
pub struct SystemMonitor {
    pub user_count: i64,
    pub active_user_count: i64,
    pub today_login_count: i64,
    pub log_count: i64,
    pub today_log_count: i64,
    /// Bytes in use by the database, from SQLite's page accounting.
    pub db_size: i64,
    pub server_time: String,
    pub uptime_seconds: u64,
}

async fn logins_since(pool: &SqlitePool, since: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE last_login >= ?")
        .bind(since)
        .fetch_one(pool)
        .await
}

pub async fn snapshot(pool: &SqlitePool, uptime: std::time::Duration) -> Result<SystemMonitor, sqlx::Error> {
    let now = Utc::now();
    let today = day_start(now.date_naive());

    let user_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    let log_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM operation_logs")
        .fetch_one(pool)
        .await?;
    let db_size: i64 =
        sqlx::query_scalar("SELECT page_count * page_size FROM pragma_page_count(), pragma_page_size()")
            .fetch_one(pool)
            .await?;

    Ok(SystemMonitor {
        user_count,
        active_user_count: logins_since(pool, &timestamp(now - Duration::days(ACTIVE_WINDOW_DAYS))).await?,
        today_login_count: logins_since(pool, &today).await?,
        log_count,
        today_log_count: count_since(pool, &today).await?,
        db_size,
        server_time: timestamp(now),
        uptime_seconds: uptime.as_secs(),
    })
}
