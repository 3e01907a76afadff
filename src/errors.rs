use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use thiserror::Error;

use crate::auth::token::AuthFailure;
use crate::response::ApiResponse;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("no bearer token supplied")]
    MissingToken,

    #[error("authorization header must use the Bearer scheme")]
    BadScheme,

    #[error("invalid token: {0}")]
    InvalidToken(#[from] AuthFailure),

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("account is disabled")]
    AccountDisabled,

    #[error("access denied")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("role '{0}' is reserved and cannot be deleted")]
    ReservedRole(String),

    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("hash error: {0}")]
    Hash(String),

    #[error("token error: {0}")]
    Token(String),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    /// Machine-readable rejection reason for the auth gates, carried in `data.reason`.
    pub fn reason(&self) -> Option<&'static str> {
        match self {
            AppError::MissingToken => Some("no_token"),
            AppError::BadScheme => Some("bad_scheme"),
            AppError::InvalidToken(_) => Some("invalid_token"),
            AppError::Forbidden => Some("forbidden"),
            AppError::ReservedRole(_) => Some("reserved_role"),
            _ => None,
        }
    }

    pub(crate) fn is_internal(&self) -> bool {
        matches!(
            self,
            AppError::Db(_) | AppError::Hash(_) | AppError::Token(_) | AppError::Internal(_)
        )
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::ReservedRole(_) => StatusCode::BAD_REQUEST,
            AppError::MissingToken
            | AppError::BadScheme
            | AppError::InvalidToken(_)
            | AppError::InvalidCredentials
            | AppError::AccountDisabled => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Db(_) | AppError::Hash(_) | AppError::Token(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = if self.is_internal() {
            log::error!("{self}");
            "Internal server error".to_string()
        } else {
            if let AppError::InvalidToken(failure) = self {
                log::debug!("token rejected: {}", failure.reason());
            }
            self.to_string()
        };
        let data = self.reason().map(|r| serde_json::json!({ "reason": r }));
        HttpResponse::build(status).json(ApiResponse {
            code: status.as_u16(),
            message,
            data,
        })
    }
}
