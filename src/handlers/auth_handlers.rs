use actix_web::{HttpResponse, web};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::auth::account::{self, Registration};
use crate::auth::token::TokenCodec;
use crate::errors::AppError;
use crate::response::{acknowledged, success};

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// POST /api/auth/register
pub async fn register(
    pool: web::Data<SqlitePool>,
    codec: web::Data<TokenCodec>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    let session = account::register(
        &pool,
        &codec,
        Registration {
            username: &body.username,
            email: &body.email,
            password: &body.password,
            role: body.role.as_deref(),
        },
    )
    .await?;
    Ok(success(session))
}

/// POST /api/auth/login
pub async fn login(
    pool: web::Data<SqlitePool>,
    codec: web::Data<TokenCodec>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let session = account::login(&pool, &codec, &body.username, &body.password).await?;
    Ok(success(session))
}

/// POST /api/auth/logout. Tokens are stateless, so the client simply drops its copy.
pub async fn logout() -> HttpResponse {
    acknowledged("Logged out")
}
