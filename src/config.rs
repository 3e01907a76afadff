use std::fmt;
use std::net::SocketAddr;

use rand::Rng;
use rand::distr::Alphanumeric;
use thiserror::Error;

use crate::auth::token::{DEFAULT_ISSUER, TokenCodec};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/app.db?mode=rwc";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8081";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

/// Signing keys shorter than this are replaced by a random one.
pub const MIN_SECRET_LEN: usize = 32;
const GENERATED_SECRET_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("BIND_ADDR '{value}' is not a valid socket address: {source}")]
    BindAddr {
        value: String,
        source: std::net::AddrParseError,
    },
}

/// Process configuration, read once at startup.
#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub jwt_secret: Vec<u8>,
    pub jwt_issuer: String,
    pub admin_password: String,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("database_url", &self.database_url)
            .field("bind_addr", &self.bind_addr)
            .field("jwt_secret", &"<redacted>")
            .field("jwt_issuer", &self.jwt_issuer)
            .field("admin_password", &"<redacted>")
            .finish()
    }
}

fn random_secret() -> Vec<u8> {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_SECRET_LEN)
        .collect()
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database_url = get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let bind_raw = get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw
            .parse()
            .map_err(|source| ConfigError::BindAddr { value: bind_raw.clone(), source })?;

        let jwt_secret = match get("JWT_SECRET") {
            Some(secret) if secret.len() >= MIN_SECRET_LEN => {
                log::info!("Using JWT_SECRET from environment");
                secret.into_bytes()
            }
            Some(secret) => {
                log::warn!(
                    "JWT_SECRET too short ({} bytes, need {MIN_SECRET_LEN}+), generating random key",
                    secret.len()
                );
                random_secret()
            }
            None => {
                log::warn!("No JWT_SECRET set, generating random key (tokens invalid after restart)");
                random_secret()
            }
        };

        let jwt_issuer = get("JWT_ISSUER").unwrap_or_else(|| DEFAULT_ISSUER.to_string());
        let admin_password = get("ADMIN_PASSWORD").unwrap_or_else(|| DEFAULT_ADMIN_PASSWORD.to_string());

        Ok(AppConfig { database_url, bind_addr, jwt_secret, jwt_issuer, admin_password })
    }

    pub fn token_codec(&self) -> TokenCodec {
        TokenCodec::new(&self.jwt_secret, self.jwt_issuer.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = AppConfig::from_lookup(lookup(&[])).expect("config");
        assert_eq!(cfg.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(cfg.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(cfg.admin_password, DEFAULT_ADMIN_PASSWORD);
        assert_eq!(cfg.jwt_issuer, DEFAULT_ISSUER);
        assert_eq!(cfg.jwt_secret.len(), GENERATED_SECRET_LEN);
    }

    #[test]
    fn long_secret_is_used_as_is() {
        let secret = "s".repeat(MIN_SECRET_LEN);
        let cfg = AppConfig::from_lookup(lookup(&[("JWT_SECRET", &secret)])).expect("config");
        assert_eq!(cfg.jwt_secret, secret.as_bytes());
    }

    #[test]
    fn short_secret_is_replaced() {
        let cfg = AppConfig::from_lookup(lookup(&[("JWT_SECRET", "short")])).expect("config");
        assert_ne!(cfg.jwt_secret, b"short");
        assert_eq!(cfg.jwt_secret.len(), GENERATED_SECRET_LEN);
    }

    #[test]
    fn bad_bind_addr_fails() {
        let err = AppConfig::from_lookup(lookup(&[("BIND_ADDR", "not-an-addr")])).unwrap_err();
        assert!(matches!(err, ConfigError::BindAddr { .. }));
    }

    #[test]
    fn debug_redacts_secrets() {
        let cfg = AppConfig::from_lookup(lookup(&[("ADMIN_PASSWORD", "hunter22")])).expect("config");
        let shown = format!("{cfg:?}");
        assert!(!shown.contains("hunter22"));
        assert!(shown.contains("<redacted>"));
    }
}
