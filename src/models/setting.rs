use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::{Sqlite, SqlitePool};

use self::ConfigType::{Boolean, Number, String as Text};
use crate::errors::AppError;
use crate::models::is_unique_violation;

/// How a configuration value is interpreted. Values are always stored as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ConfigType {
    #[default]
    String,
    Number,
    Boolean,
    Json,
}

impl ConfigType {
    /// Check that `value` is a well-formed literal of this type.
    pub fn validate(self, value: &str) -> Result<(), String> {
        match self {
            ConfigType::String => Ok(()),
            ConfigType::Number => match value.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => Ok(()),
                _ => Err(format!("'{value}' is not a number")),
            },
            ConfigType::Boolean => match value {
                "true" | "false" => Ok(()),
                _ => Err("boolean values must be true or false".to_string()),
            },
            ConfigType::Json => serde_json::from_str::<serde_json::Value>(value)
                .map(|_| ())
                .map_err(|e| format!("invalid JSON: {e}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct SystemConfig {
    pub id: i64,
    pub key: String,
    pub value: String,
    #[serde(rename = "type")]
    pub value_type: ConfigType,
    pub category: String,
    pub display_name: String,
    pub description: String,
    pub is_public: bool,
    pub is_editable: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewConfig {
    pub key: String,
    #[serde(default)]
    pub value: String,
    #[serde(rename = "type", default)]
    pub value_type: ConfigType,
    pub category: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default = "editable_by_default")]
    pub is_editable: bool,
}

fn editable_by_default() -> bool {
    true
}

pub struct ConfigDefault {
    pub key: &'static str,
    pub value: &'static str,
    pub value_type: ConfigType,
    pub category: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    pub is_public: bool,
    pub is_editable: bool,
}

impl ConfigDefault {
    const fn public(self) -> Self {
        ConfigDefault { is_public: true, ..self }
    }

    const fn read_only(self) -> Self {
        ConfigDefault { is_editable: false, ..self }
    }
}

/// A private, editable default. Chain `.public()` or `.read_only()` to change that.
const fn entry(
    category: &'static str,
    key: &'static str,
    value: &'static str,
    value_type: ConfigType,
    display_name: &'static str,
    description: &'static str,
) -> ConfigDefault {
    ConfigDefault {
        key,
        value,
        value_type,
        category,
        display_name,
        description,
        is_public: false,
        is_editable: true,
    }
}

pub const DEFAULT_CONFIGS: &[ConfigDefault] = &[
    entry("basic", "site_name", "Jing Admin", Text, "Site name", "Name shown across the system").public(),
    entry("basic", "site_description", "Modern administration backend", Text, "Site description", "Short description of the system").public(),
    entry("basic", "site_keywords", "admin,backend,rbac", Text, "Site keywords", "SEO keywords").public(),
    entry("basic", "site_logo", "/logo.png", Text, "Site logo", "Logo image location").public(),
    entry("basic", "copyright", "© 2024 Jing Admin. All Rights Reserved.", Text, "Copyright", "Copyright notice").public(),
    entry("mail", "mail_host", "", Text, "Mail server", "SMTP server host"),
    entry("mail", "mail_port", "587", Number, "Mail port", "SMTP server port"),
    entry("mail", "mail_username", "", Text, "Mail username", "Account used to send mail"),
    entry("mail", "mail_password", "", Text, "Mail password", "Password of the sending account"),
    entry("mail", "mail_from", "", Text, "Sender", "Sender address"),
    entry("security", "session_timeout", "3600", Number, "Session timeout", "Session timeout in seconds"),
    entry("security", "password_min_length", "6", Number, "Minimum password length", "Minimum length of user passwords").public(),
    entry("security", "enable_captcha", "false", Boolean, "Enable captcha", "Require a captcha at login").public(),
    entry("security", "max_login_attempts", "5", Number, "Maximum login attempts", "Failed attempts before an account is locked"),
    entry("system", "system_version", "1.0.0", Text, "System version", "Current system version").public().read_only(),
    entry("system", "upload_max_size", "10485760", Number, "Upload size limit", "Maximum upload size in bytes"),
    entry("system", "upload_allowed_types", "jpg,jpeg,png,gif,pdf,doc,docx,xls,xlsx", Text, "Allowed upload types", "File extensions accepted for upload"),
    entry("system", "pagination_size", "20", Number, "Page size", "Default page size").public(),
];

pub fn default_for(key: &str) -> Option<&'static ConfigDefault> {
    DEFAULT_CONFIGS.iter().find(|d| d.key == key)
}

const SELECT_CONFIG: &str = "\
    SELECT id, key, value, value_type, category, display_name, description, \
           is_public, is_editable, created_at, updated_at \
    FROM system_configs";

async fn fetch_by_key<'e, E>(executor: E, key: &str) -> Result<Option<SystemConfig>, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, SystemConfig>(&format!("{SELECT_CONFIG} WHERE key = ?"))
        .bind(key)
        .fetch_optional(executor)
        .await
}

async fn store_value<'e, E>(executor: E, id: i64, value: &str) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "UPDATE system_configs SET value = ?, updated_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now') WHERE id = ?",
    )
    .bind(value)
    .bind(id)
    .execute(executor)
    .await?;
    Ok(())
}

/// Reject writes to locked entries and values that do not match the entry's type.
fn check_writable(config: &SystemConfig, value: &str) -> Result<(), AppError> {
    if !config.is_editable {
        return Err(AppError::Validation(format!("config '{}' is not editable", config.key)));
    }
    config
        .value_type
        .validate(value)
        .map_err(|e| AppError::Validation(format!("config '{}': {e}", config.key)))
}

pub async fn find_all(pool: &SqlitePool, category: Option<&str>) -> Result<Vec<SystemConfig>, sqlx::Error> {
    match category {
        Some(category) => {
            sqlx::query_as::<_, SystemConfig>(&format!("{SELECT_CONFIG} WHERE category = ? ORDER BY category, id"))
                .bind(category)
                .fetch_all(pool)
                .await
        }
        None => {
            sqlx::query_as::<_, SystemConfig>(&format!("{SELECT_CONFIG} ORDER BY category, id"))
                .fetch_all(pool)
                .await
        }
    }
}

/// Key to value map of the entries flagged public.
pub async fn public_map(pool: &SqlitePool) -> Result<BTreeMap<String, String>, sqlx::Error> {
    let rows: Vec<(String, String)> = sqlx::query_as("SELECT key, value FROM system_configs WHERE is_public = 1")
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().collect())
}

pub async fn find_by_key(pool: &SqlitePool, key: &str) -> Result<Option<SystemConfig>, sqlx::Error> {
    fetch_by_key(pool, key).await
}

/// A single value by key, falling back to `default` when the key is absent.
pub async fn get_value(pool: &SqlitePool, key: &str, default: &str) -> Result<String, sqlx::Error> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM system_configs WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;
    Ok(value.unwrap_or_else(|| default.to_string()))
}

pub async fn update_value(pool: &SqlitePool, key: &str, value: &str) -> Result<SystemConfig, AppError> {
    let config = fetch_by_key(pool, key).await?.ok_or(AppError::NotFound("config"))?;
    check_writable(&config, value)?;
    store_value(pool, config.id, value).await?;
    fetch_by_key(pool, key).await?.ok_or(AppError::NotFound("config"))
}

/// Update several entries at once. Any unknown key, locked entry or bad value
/// aborts the whole batch with nothing written.
pub async fn batch_update(pool: &SqlitePool, values: &BTreeMap<String, String>) -> Result<usize, AppError> {
    let mut tx = pool.begin().await?;
    for (key, value) in values {
        let config = fetch_by_key(&mut *tx, key)
            .await?
            .ok_or(AppError::NotFound("config"))?;
        check_writable(&config, value)?;
        store_value(&mut *tx, config.id, value).await?;
    }
    tx.commit().await?;
    Ok(values.len())
}

pub async fn create(pool: &SqlitePool, new: &NewConfig) -> Result<SystemConfig, AppError> {
    new.value_type
        .validate(&new.value)
        .map_err(|e| AppError::Validation(format!("config '{}': {e}", new.key)))?;

    sqlx::query(
        "INSERT INTO system_configs \
             (key, value, value_type, category, display_name, description, is_public, is_editable) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(new.key.trim())
    .bind(&new.value)
    .bind(new.value_type)
    .bind(new.category.trim())
    .bind(new.display_name.trim())
    .bind(&new.description)
    .bind(new.is_public)
    .bind(new.is_editable)
    .execute(pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(format!("config '{}' already exists", new.key.trim()))
        } else {
            AppError::Db(e)
        }
    })?;

    fetch_by_key(pool, new.key.trim()).await?.ok_or(AppError::NotFound("config"))
}

/// Locked entries cannot be deleted.
pub async fn delete(pool: &SqlitePool, key: &str) -> Result<(), AppError> {
    let config = fetch_by_key(pool, key).await?.ok_or(AppError::NotFound("config"))?;
    if !config.is_editable {
        return Err(AppError::Validation(format!("config '{key}' cannot be deleted")));
    }
    sqlx::query("DELETE FROM system_configs WHERE id = ?")
        .bind(config.id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Restore the seeded value of an entry.
pub async fn reset_to_default(pool: &SqlitePool, key: &str) -> Result<SystemConfig, AppError> {
    let config = fetch_by_key(pool, key).await?.ok_or(AppError::NotFound("config"))?;
    if !config.is_editable {
        return Err(AppError::Validation(format!("config '{key}' cannot be reset")));
    }
    let default = default_for(key)
        .ok_or_else(|| AppError::Validation(format!("config '{key}' has no default value")))?;
    store_value(pool, config.id, default.value).await?;
    fetch_by_key(pool, key).await?.ok_or(AppError::NotFound("config"))
}

/// Insert every default entry whose key is absent. Existing values are kept.
pub async fn seed_defaults(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
    let mut inserted = 0;
    for d in DEFAULT_CONFIGS {
        inserted += sqlx::query(
            "INSERT OR IGNORE INTO system_configs \
                 (key, value, value_type, category, display_name, description, is_public, is_editable) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(d.key)
        .bind(d.value)
        .bind(d.value_type)
        .bind(d.category)
        .bind(d.display_name)
        .bind(d.description)
        .bind(d.is_public)
        .bind(d.is_editable)
        .execute(pool)
        .await?
        .rows_affected();
    }
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_must_parse() {
        assert!(ConfigType::Number.validate("587").is_ok());
        assert!(ConfigType::Number.validate("1.5").is_ok());
        assert!(ConfigType::Number.validate("abc").is_err());
        assert!(ConfigType::Number.validate("NaN").is_err());
    }

    #[test]
    fn booleans_are_literal() {
        assert!(ConfigType::Boolean.validate("true").is_ok());
        assert!(ConfigType::Boolean.validate("false").is_ok());
        assert!(ConfigType::Boolean.validate("TRUE").is_err());
        assert!(ConfigType::Boolean.validate("1").is_err());
    }

    #[test]
    fn json_must_parse() {
        assert!(ConfigType::Json.validate(r#"{"a": [1, 2]}"#).is_ok());
        assert!(ConfigType::Json.validate("{a:").is_err());
    }

    #[test]
    fn strings_accept_anything() {
        assert!(ConfigType::String.validate("").is_ok());
    }

    #[test]
    fn defaults_match_their_declared_types() {
        for d in DEFAULT_CONFIGS {
            assert!(d.value_type.validate(d.value).is_ok(), "{} has a bad default", d.key);
        }
        assert_eq!(DEFAULT_CONFIGS.len(), 18);
    }

    #[test]
    fn visibility_flags_follow_the_table() {
        let version = default_for("system_version").expect("seeded");
        assert!(version.is_public && !version.is_editable);
        let secret = default_for("mail_password").expect("seeded");
        assert!(!secret.is_public && secret.is_editable);
        assert_eq!(secret.category, "mail");
    }

    #[test]
    fn type_serializes_lowercase() {
        let json = serde_json::to_string(&ConfigType::Boolean).expect("serialize");
        assert_eq!(json, "\"boolean\"");
    }
}
