use std::future::Future;
use std::pin::Pin;

use actix_web::{
    Error, HttpMessage, ResponseError,
    body::{EitherBody, MessageBody},
    dev::{ServiceRequest, ServiceResponse},
    http::header::AUTHORIZATION,
    middleware::Next,
    web,
};
use sqlx::SqlitePool;

use super::identity::Identity;
use super::token::TokenCodec;
use crate::errors::AppError;
use crate::models::permission::PermissionName;
use crate::models::rbac;

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn parse_bearer(header: Option<&str>) -> Result<&str, AppError> {
    let value = match header {
        None => return Err(AppError::MissingToken),
        Some(v) if v.trim().is_empty() => return Err(AppError::MissingToken),
        Some(v) => v,
    };
    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(AppError::BadScheme),
    }
}

fn authenticate(req: &ServiceRequest) -> Result<Identity, AppError> {
    let header = match req.headers().get(AUTHORIZATION) {
        None => None,
        Some(v) => Some(v.to_str().map_err(|_| AppError::BadScheme)?),
    };
    let token = parse_bearer(header)?;

    let codec = req
        .app_data::<web::Data<TokenCodec>>()
        .ok_or_else(|| AppError::Internal("token codec is not registered".to_string()))?;

    let claims = codec.validate(token)?;
    Ok(claims.identity())
}

/// Gate: requires a valid session token and attaches the caller's `Identity`
/// to the request. Rejects with 401 before any handler runs.
pub async fn require_auth(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let identity = match authenticate(&req) {
        Ok(identity) => identity,
        Err(e) => {
            let response = e.error_response();
            return Ok(req.into_response(response).map_into_right_body());
        }
    };

    req.extensions_mut().insert(identity);
    next.call(req).await.map(|res| res.map_into_left_body())
}

/// Gate: requires the authenticated caller's legacy role label to be `admin`.
/// Must be layered inside `require_auth`.
pub async fn require_admin(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let verdict = match req.extensions().get::<Identity>() {
        None => Err(AppError::MissingToken),
        Some(identity) if identity.is_admin() => Ok(()),
        Some(identity) => {
            log::debug!("user {} denied admin route {}", identity.user_id, req.path());
            Err(AppError::Forbidden)
        }
    };

    if let Err(e) = verdict {
        let response = e.error_response();
        return Ok(req.into_response(response).map_into_right_body());
    }

    next.call(req).await.map(|res| res.map_into_left_body())
}

type GateFuture<B> = Pin<Box<dyn Future<Output = Result<ServiceResponse<EitherBody<B>>, Error>>>>;

async fn check_permission(req: &ServiceRequest, permission: &PermissionName) -> Result<(), AppError> {
    let identity = req
        .extensions()
        .get::<Identity>()
        .cloned()
        .ok_or(AppError::MissingToken)?;
    let pool = req
        .app_data::<web::Data<SqlitePool>>()
        .cloned()
        .ok_or_else(|| AppError::Internal("database pool is not registered".to_string()))?;

    if rbac::user_has_permission(&pool, identity.user_id, permission).await? {
        return Ok(());
    }
    log::debug!(
        "user {} lacks {} for {}",
        identity.user_id,
        permission,
        req.path()
    );
    Err(AppError::Forbidden)
}

/// Gate: requires the caller to hold `permission` through at least one active
/// role. Must be layered inside `require_auth`; rejects with 403 `forbidden`.
pub fn require_permission<B>(permission: PermissionName) -> impl Fn(ServiceRequest, Next<B>) -> GateFuture<B>
where
    B: MessageBody + 'static,
{
    move |req, next| {
        let permission = permission.clone();
        Box::pin(async move {
            if let Err(e) = check_permission(&req, &permission).await {
                let response = e.error_response();
                return Ok(req.into_response(response).map_into_right_body());
            }
            next.call(req).await.map(|res| res.map_into_left_body())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_or_blank_header_is_no_token() {
        assert!(matches!(parse_bearer(None), Err(AppError::MissingToken)));
        assert!(matches!(parse_bearer(Some("  ")), Err(AppError::MissingToken)));
    }

    #[test]
    fn wrong_scheme_is_rejected() {
        assert!(matches!(parse_bearer(Some("Basic abc")), Err(AppError::BadScheme)));
        assert!(matches!(parse_bearer(Some("bearer abc")), Err(AppError::BadScheme)));
        assert!(matches!(parse_bearer(Some("Bearer ")), Err(AppError::BadScheme)));
        assert!(matches!(parse_bearer(Some("abc.def.ghi")), Err(AppError::BadScheme)));
    }

    #[test]
    fn bearer_token_is_extracted() {
        assert_eq!(parse_bearer(Some("Bearer abc.def.ghi")).ok(), Some("abc.def.ghi"));
    }
}
