use actix_web::{HttpResponse, web};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::auth::account;
use crate::auth::identity::Identity;
use crate::auth::validate::{into_result, validate_email, validate_optional};
use crate::errors::AppError;
use crate::models::rbac;
use crate::models::user::{self, ProfileFields, UserProfile};
use crate::response::{acknowledged, success};

#[derive(Deserialize)]
pub struct ProfileRequest {
    pub email: String,
    #[serde(flatten)]
    pub profile: ProfileFields,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Length limits of the free-text profile fields.
pub(crate) fn validate_profile(profile: &ProfileFields) -> Vec<String> {
    let mut errors = Vec::new();
    errors.extend(validate_optional(&profile.real_name, "Real name", 100));
    errors.extend(validate_optional(&profile.phone, "Phone", 30));
    errors.extend(validate_optional(&profile.avatar, "Avatar", 255));
    errors.extend(validate_optional(&profile.department, "Department", 100));
    errors.extend(validate_optional(&profile.position, "Position", 100));
    errors.extend(validate_optional(&profile.bio, "Bio", 500));
    errors
}

/// GET /api/me
pub async fn me(pool: web::Data<SqlitePool>, identity: Identity) -> Result<HttpResponse, AppError> {
    let current = user::find_by_id(&pool, identity.user_id)
        .await?
        .ok_or(AppError::NotFound("user"))?;
    Ok(success(UserProfile::from(current)))
}

/// PUT /api/me. Username and role label are not editable here.
pub async fn update_profile(
    pool: web::Data<SqlitePool>,
    identity: Identity,
    body: web::Json<ProfileRequest>,
) -> Result<HttpResponse, AppError> {
    let email = body.email.trim();
    let mut errors = Vec::new();
    errors.extend(validate_email(email));
    errors.extend(validate_profile(&body.profile));
    into_result(errors)?;

    if user::email_taken_by_other(&pool, email, identity.user_id).await? {
        return Err(AppError::Conflict("email already in use".to_string()));
    }
    if !user::update_profile(&pool, identity.user_id, email, &body.profile).await? {
        return Err(AppError::NotFound("user"));
    }

    let updated = user::find_by_id(&pool, identity.user_id)
        .await?
        .ok_or(AppError::NotFound("user"))?;
    Ok(success(UserProfile::from(updated)))
}

/// POST /api/change-password
pub async fn change_password(
    pool: web::Data<SqlitePool>,
    identity: Identity,
    body: web::Json<ChangePasswordRequest>,
) -> Result<HttpResponse, AppError> {
    account::change_password(&pool, identity.user_id, &body.current_password, &body.new_password).await?;
    Ok(acknowledged("Password changed"))
}

/// GET /api/my-permissions: the caller's resolved permission set.
pub async fn my_permissions(pool: web::Data<SqlitePool>, identity: Identity) -> Result<HttpResponse, AppError> {
    let permissions = rbac::permissions_of(&pool, identity.user_id).await?;
    Ok(success(serde_json::json!({
        "user_id": identity.user_id,
        "permissions": permissions,
    })))
}
