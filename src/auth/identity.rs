use std::future::{Ready, ready};

use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload};
use serde::Serialize;

use crate::errors::AppError;

/// Legacy role label that opens the admin gate.
pub const ADMIN_ROLE_LABEL: &str = "admin";

/// Authenticated caller, attached to the request by the auth gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub user_id: i64,
    pub username: String,
    pub role: String,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE_LABEL
    }
}

/// Handlers behind `require_auth` take `Identity` as an argument. Used on a
/// route without the gate it rejects with `no_token`.
impl FromRequest for Identity {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<Identity>()
                .cloned()
                .ok_or(AppError::MissingToken),
        )
    }
}
