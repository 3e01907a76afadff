//! Operation log gate: records every authenticated request after it completes.

use actix_web::{
    Error, HttpMessage,
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    http::{Method, header::USER_AGENT},
    middleware::Next,
    web,
};
use sqlx::SqlitePool;

use crate::auth::identity::Identity;
use crate::models::operation_log::{self, NewOperationLog};

/// Paths polled by clients on every page load; logging them would drown the log.
const UNLOGGED_PATHS: &[&str] = &["/api/me", "/api/my-permissions", "/health"];

pub fn should_record(path: &str) -> bool {
    !UNLOGGED_PATHS.contains(&path.trim_end_matches('/'))
}

pub fn action_for_method(method: &Method) -> &'static str {
    match *method {
        Method::GET => "read",
        Method::POST => "create",
        Method::PUT | Method::PATCH => "update",
        Method::DELETE => "delete",
        _ => "other",
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .skip_while(|s| *s == "api")
}

/// `/export/<x>` and `/import/<x>` belong to the resource they move.
pub fn resource_for_path(path: &str) -> &'static str {
    let mut parts = segments(path);
    let head = match parts.next() {
        Some("export" | "import") => parts.next(),
        other => other,
    };
    match head {
        Some("users") => "user",
        Some("roles") => "role",
        Some("permissions") => "permission",
        Some("system" | "config") => "system",
        Some("logs") => "log",
        Some("auth") => "auth",
        Some("me" | "change-password") => "account",
        _ => "other",
    }
}

/// The first purely numeric segment, or the config key under `/config/<key>`.
pub fn resource_id_for_path(path: &str) -> String {
    let mut parts = segments(path);
    let first = parts.next();
    let rest: Vec<&str> = parts.collect();
    if let Some(id) = rest.iter().find(|s| s.chars().all(|c| c.is_ascii_digit())) {
        return id.to_string();
    }
    match (first, rest.first()) {
        (Some("config"), Some(key)) if !matches!(*key, "batch" | "public") => key.to_string(),
        _ => String::new(),
    }
}

/// Gate: layered inside `require_auth`. The write runs on a spawned task so a
/// storage failure never reaches the caller.
pub async fn record_operations(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let path = req.path().to_string();
    let identity = req.extensions().get::<Identity>().cloned();
    let pool = req.app_data::<web::Data<SqlitePool>>().cloned();

    let (identity, pool) = match (identity, pool) {
        (Some(identity), Some(pool)) if should_record(&path) => (identity, pool),
        _ => return next.call(req).await,
    };

    let method = req.method().clone();
    let ip = req
        .connection_info()
        .realip_remote_addr()
        .unwrap_or("unknown")
        .to_string();
    let user_agent = req
        .headers()
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let res = next.call(req).await?;

    let entry = NewOperationLog {
        user_id: identity.user_id,
        username: identity.username,
        action: action_for_method(&method).to_string(),
        resource: resource_for_path(&path).to_string(),
        resource_id: resource_id_for_path(&path),
        method: method.to_string(),
        path,
        ip,
        user_agent,
        status: res.status().as_u16(),
        details: String::new(),
    };
    actix_web::rt::spawn(async move {
        if let Err(e) = operation_log::record(&pool, &entry).await {
            log::warn!("Failed to record operation on {}: {}", entry.path, e);
        }
    });

    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polling_paths_are_skipped() {
        assert!(!should_record("/api/me"));
        assert!(!should_record("/api/my-permissions/"));
        assert!(should_record("/api/users"));
        assert!(should_record("/api/me/extra"));
    }

    #[test]
    fn actions_follow_the_method() {
        assert_eq!(action_for_method(&Method::GET), "read");
        assert_eq!(action_for_method(&Method::POST), "create");
        assert_eq!(action_for_method(&Method::PUT), "update");
        assert_eq!(action_for_method(&Method::DELETE), "delete");
        assert_eq!(action_for_method(&Method::OPTIONS), "other");
    }

    #[test]
    fn resources_follow_the_first_segment() {
        assert_eq!(resource_for_path("/api/users/7/roles"), "user");
        assert_eq!(resource_for_path("/api/roles"), "role");
        assert_eq!(resource_for_path("/api/permissions/assign"), "permission");
        assert_eq!(resource_for_path("/api/config/site_name"), "system");
        assert_eq!(resource_for_path("/api/system/info"), "system");
        assert_eq!(resource_for_path("/api/change-password"), "account");
        assert_eq!(resource_for_path("/api/whatever"), "other");
    }

    #[test]
    fn transfers_belong_to_the_resource_they_move() {
        assert_eq!(resource_for_path("/api/export/users"), "user");
        assert_eq!(resource_for_path("/api/import/permissions"), "permission");
        assert_eq!(resource_for_path("/api/export"), "other");
    }

    #[test]
    fn resource_ids_are_numeric_segments_or_config_keys() {
        assert_eq!(resource_id_for_path("/api/users/42/roles"), "42");
        assert_eq!(resource_id_for_path("/api/users"), "");
        assert_eq!(resource_id_for_path("/api/config/site_name"), "site_name");
        assert_eq!(resource_id_for_path("/api/config/batch"), "");
    }
}
