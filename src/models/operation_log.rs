use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

/// Entries older than this many days are removed by the cleanup endpoint.
pub const RETENTION_DAYS: i64 = 30;

/// Format of every stored timestamp. Lexical order equals time order.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct OperationLog {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub action: String,
    pub resource: String,
    pub resource_id: String,
    pub method: String,
    pub path: String,
    pub ip: String,
    pub user_agent: String,
    pub status: i64,
    pub details: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Default)]
pub struct NewOperationLog {
    pub user_id: i64,
    pub username: String,
    pub action: String,
    pub resource: String,
    pub resource_id: String,
    pub method: String,
    pub path: String,
    pub ip: String,
    pub user_agent: String,
    pub status: u16,
    pub details: String,
}

/// Listing filters. Dates are inclusive whole days in UTC.
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    pub username: Option<String>,
    pub action: Option<String>,
    pub resource: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct CountBy {
    pub label: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogStats {
    pub total: i64,
    pub today: i64,
    pub week: i64,
    pub by_action: Vec<CountBy>,
    pub by_resource: Vec<CountBy>,
    pub top_users: Vec<CountBy>,
}

pub(crate) fn timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

pub(crate) fn day_start(day: NaiveDate) -> String {
    format!("{}T00:00:00Z", day.format("%Y-%m-%d"))
}

fn day_end(day: NaiveDate) -> String {
    format!("{}T23:59:59Z", day.format("%Y-%m-%d"))
}

const SELECT_LOG: &str = "\
    SELECT id, user_id, username, action, resource, resource_id, method, path, ip, \
           user_agent, status, details, created_at \
    FROM operation_logs";

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &LogFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(username) = filter.username.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        qb.push(" AND username LIKE ").push_bind(format!("%{username}%"));
    }
    if let Some(action) = filter.action.as_deref().filter(|s| !s.is_empty()) {
        qb.push(" AND action = ").push_bind(action.to_string());
    }
    if let Some(resource) = filter.resource.as_deref().filter(|s| !s.is_empty()) {
        qb.push(" AND resource = ").push_bind(resource.to_string());
    }
    if let Some(day) = filter.start_date {
        qb.push(" AND created_at >= ").push_bind(day_start(day));
    }
    if let Some(day) = filter.end_date {
        qb.push(" AND created_at <= ").push_bind(day_end(day));
    }
}

pub async fn record(pool: &SqlitePool, entry: &NewOperationLog) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO operation_logs \
             (user_id, username, action, resource, resource_id, method, path, ip, user_agent, status, details) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(entry.user_id)
    .bind(&entry.username)
    .bind(&entry.action)
    .bind(&entry.resource)
    .bind(&entry.resource_id)
    .bind(&entry.method)
    .bind(&entry.path)
    .bind(&entry.ip)
    .bind(&entry.user_agent)
    .bind(i64::from(entry.status))
    .bind(&entry.details)
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

/// Newest first. `page` starts at 1 and `page_size` is clamped to 1..=100.
/// A page past the end is empty. Returns the page of entries with the total
/// count matching the filter.
pub async fn find_paginated(
    pool: &SqlitePool,
    filter: &LogFilter,
    page: i64,
    page_size: i64,
) -> Result<(Vec<OperationLog>, i64), sqlx::Error> {
    let page = page.max(1);
    let page_size = page_size.clamp(1, 100);

    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM operation_logs");
    push_filters(&mut count, filter);
    let total = count.build_query_scalar::<i64>().fetch_one(pool).await?;

    let mut select = QueryBuilder::<Sqlite>::new(SELECT_LOG);
    push_filters(&mut select, filter);
    select
        .push(" ORDER BY created_at DESC, id DESC LIMIT ")
        .push_bind(page_size)
        .push(" OFFSET ")
        .push_bind((page - 1).saturating_mul(page_size));
    let entries = select.build_query_as::<OperationLog>().fetch_all(pool).await?;

    Ok((entries, total))
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<OperationLog>, sqlx::Error> {
    sqlx::query_as::<_, OperationLog>(&format!("{SELECT_LOG} WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM operation_logs WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Returns how many of `ids` were removed.
pub async fn delete_many(pool: &SqlitePool, ids: &[i64]) -> Result<u64, sqlx::Error> {
    if ids.is_empty() {
        return Ok(0);
    }
    let mut qb = QueryBuilder::<Sqlite>::new("DELETE FROM operation_logs WHERE id IN (");
    let mut separated = qb.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");
    Ok(qb.build().execute(pool).await?.rows_affected())
}

pub async fn delete_older_than(pool: &SqlitePool, days: i64) -> Result<u64, sqlx::Error> {
    let cutoff = timestamp(Utc::now() - Duration::days(days));
    let result = sqlx::query("DELETE FROM operation_logs WHERE created_at < ?")
        .bind(cutoff)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub(crate) async fn count_since(pool: &SqlitePool, since: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM operation_logs WHERE created_at >= ?")
        .bind(since)
        .fetch_one(pool)
        .await
}

pub async fn stats(pool: &SqlitePool) -> Result<LogStats, sqlx::Error> {
    let now = Utc::now();
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM operation_logs")
        .fetch_one(pool)
        .await?;
    let today = count_since(pool, &day_start(now.date_naive())).await?;
    let week = count_since(pool, &timestamp(now - Duration::days(7))).await?;

    let by_action = sqlx::query_as::<_, CountBy>(
        "SELECT action AS label, COUNT(*) AS count FROM operation_logs GROUP BY action ORDER BY count DESC, label",
    )
    .fetch_all(pool)
    .await?;
    let by_resource = sqlx::query_as::<_, CountBy>(
        "SELECT resource AS label, COUNT(*) AS count FROM operation_logs GROUP BY resource ORDER BY count DESC, label",
    )
    .fetch_all(pool)
    .await?;
    let top_users = sqlx::query_as::<_, CountBy>(
        "SELECT username AS label, COUNT(*) AS count FROM operation_logs \
         GROUP BY username ORDER BY count DESC, label LIMIT 10",
    )
    .fetch_all(pool)
    .await?;

    Ok(LogStats { total, today, week, by_action, by_resource, top_users })
}
