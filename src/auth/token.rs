//! Signed, time-bound session tokens (HS256 JWT).
//!
//! Tokens are stateless: nothing is stored server-side, so a token stays valid
//! until `exp` even after the client logs out.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::identity::Identity;
use crate::errors::AppError;

/// Session lifetime.
pub const TOKEN_TTL_HOURS: i64 = 24;

pub const DEFAULT_ISSUER: &str = "jing-admin";

/// Why a presented token was rejected.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    #[error("malformed token")]
    Malformed,
    #[error("signature does not verify")]
    SignatureInvalid,
    #[error("token has expired")]
    Expired,
    #[error("unexpected signing algorithm")]
    AlgMismatch,
}

impl AuthFailure {
    pub fn reason(&self) -> &'static str {
        match self {
            AuthFailure::Malformed => "malformed",
            AuthFailure::SignatureInvalid => "signature_invalid",
            AuthFailure::Expired => "expired",
            AuthFailure::AlgMismatch => "alg_mismatch",
        }
    }
}

/// Identity claims carried inside a session token. Time fields use the
/// registered JWT claim names so expiry and issuer are checked on decode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub user_id: i64,
    pub username: String,
    pub role: String,
    #[serde(rename = "iat")]
    pub issued_at: i64,
    #[serde(rename = "exp")]
    pub expires_at: i64,
    #[serde(rename = "iss")]
    pub issuer: String,
}

impl Claims {
    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.user_id,
            username: self.username.clone(),
            role: self.role.clone(),
        }
    }
}

#[derive(Deserialize)]
struct RawHeader {
    alg: String,
}

/// The `alg` named in the token header. Read from the raw JSON so that names
/// the JWT library does not model (such as `none`) are still reported.
fn header_alg(token: &str) -> Result<String, AuthFailure> {
    let encoded = token
        .split('.')
        .next()
        .filter(|s| !s.is_empty())
        .ok_or(AuthFailure::Malformed)?;
    let raw = URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|_| AuthFailure::Malformed)?;
    let header: RawHeader = serde_json::from_slice(&raw).map_err(|_| AuthFailure::Malformed)?;
    Ok(header.alg)
}

#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    ttl: Duration,
}

impl TokenCodec {
    pub const ALGORITHM: Algorithm = Algorithm::HS256;

    /// Build a codec from the process-wide signing secret.
    pub fn new(secret: &[u8], issuer: impl Into<String>) -> Self {
        TokenCodec {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            issuer: issuer.into(),
            ttl: Duration::hours(TOKEN_TTL_HOURS),
        }
    }

    pub fn issue(&self, who: &Identity) -> Result<String, AppError> {
        self.issue_at(who, Utc::now())
    }

    fn issue_at(&self, who: &Identity, now: DateTime<Utc>) -> Result<String, AppError> {
        let claims = Claims {
            user_id: who.user_id,
            username: who.username.clone(),
            role: who.role.clone(),
            issued_at: now.timestamp(),
            expires_at: (now + self.ttl).timestamp(),
            issuer: self.issuer.clone(),
        };
        encode(&Header::new(Self::ALGORITHM), &claims, &self.encoding)
            .map_err(|e| AppError::Token(format!("jwt encode: {e}")))
    }

    /// Verify algorithm, signature, issuer and expiry, returning the claims.
    pub fn validate(&self, token: &str) -> Result<Claims, AuthFailure> {
        let alg = header_alg(token)?;
        if alg.parse::<Algorithm>().ok() != Some(Self::ALGORITHM) {
            return Err(AuthFailure::AlgMismatch);
        }

        let mut validation = Validation::new(Self::ALGORITHM);
        validation.leeway = 0;
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iat", "iss"]);

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthFailure::Expired,
                ErrorKind::InvalidSignature => AuthFailure::SignatureInvalid,
                ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                    AuthFailure::AlgMismatch
                }
                _ => AuthFailure::Malformed,
            })
    }
}
