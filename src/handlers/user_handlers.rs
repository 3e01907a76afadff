use actix_web::{HttpResponse, web};
use serde::Deserialize;
use sqlx::SqlitePool;

use super::account_handlers::validate_profile;
use crate::auth::account::create_account;
use crate::auth::identity::Identity;
use crate::auth::password::hash_password;
use crate::auth::validate::{into_result, validate_email, validate_password, validate_role_name, validate_username};
use crate::errors::AppError;
use crate::models::user::{self, DEFAULT_ROLE_LABEL, NewUser, ProfileFields, UserProfile, UserUpdate};
use crate::models::{is_unique_violation, rbac, role};
use crate::response::{acknowledged, success};

fn active_by_default() -> bool {
    true
}

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default = "active_by_default")]
    pub status: bool,
    #[serde(flatten)]
    pub profile: ProfileFields,
}

#[derive(Deserialize)]
pub struct UpdateUserRequest {
    pub email: String,
    pub role: String,
    pub status: bool,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(flatten)]
    pub profile: ProfileFields,
}

#[derive(Deserialize)]
pub struct AssignRolesRequest {
    #[serde(default)]
    pub role_ids: Vec<i64>,
}

/// GET /api/users
pub async fn list(pool: web::Data<SqlitePool>) -> Result<HttpResponse, AppError> {
    let users: Vec<UserProfile> = user::find_all(&pool)
        .await?
        .into_iter()
        .map(UserProfile::from)
        .collect();
    let total = users.len();
    Ok(success(serde_json::json!({ "users": users, "total": total })))
}

/// GET /api/users/{id}
pub async fn read(pool: web::Data<SqlitePool>, path: web::Path<i64>) -> Result<HttpResponse, AppError> {
    let found = user::find_by_id(&pool, path.into_inner())
        .await?
        .ok_or(AppError::NotFound("user"))?;
    Ok(success(UserProfile::from(found)))
}

/// POST /api/users
pub async fn create(
    pool: web::Data<SqlitePool>,
    body: web::Json<CreateUserRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let username = body.username.trim();
    let email = body.email.trim();
    let role_label = body
        .role
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or(DEFAULT_ROLE_LABEL);

    let mut errors = Vec::new();
    errors.extend(validate_username(username));
    errors.extend(validate_email(email));
    errors.extend(validate_password(&body.password));
    errors.extend(validate_role_name(role_label));
    errors.extend(validate_profile(&body.profile));
    into_result(errors)?;

    if user::is_taken(&pool, username, email).await? {
        return Err(AppError::Conflict("username or email already exists".to_string()));
    }

    let new = NewUser {
        username: username.to_string(),
        email: email.to_string(),
        password: hash_password(&body.password)?,
        role: role_label.to_string(),
        status: body.status,
        profile: body.profile.clone(),
    };
    let id = create_account(&pool, &new).await?;
    log::info!("admin created user '{username}' ({id})");

    let created = user::find_by_id(&pool, id).await?.ok_or(AppError::NotFound("user"))?;
    Ok(success(UserProfile::from(created)))
}

/// PUT /api/users/{id}. An empty or missing `password` keeps the current one.
pub async fn update(
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    body: web::Json<UpdateUserRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let body = body.into_inner();
    let email = body.email.trim();
    let role_label = body.role.trim();
    let new_password = body.password.as_deref().filter(|p| !p.is_empty());

    let mut errors = Vec::new();
    errors.extend(validate_email(email));
    errors.extend(validate_role_name(role_label));
    errors.extend(validate_profile(&body.profile));
    if let Some(p) = new_password {
        errors.extend(validate_password(p));
    }
    into_result(errors)?;

    if user::email_taken_by_other(&pool, email, id).await? {
        return Err(AppError::Conflict("email already in use".to_string()));
    }

    let upd = UserUpdate {
        email: email.to_string(),
        role: role_label.to_string(),
        status: body.status,
        profile: body.profile.clone(),
        password: new_password.map(hash_password).transpose()?,
    };
    let updated = user::update(&pool, id, &upd).await.map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("email already in use".to_string())
        } else {
            AppError::Db(e)
        }
    })?;
    if !updated {
        return Err(AppError::NotFound("user"));
    }

    let found = user::find_by_id(&pool, id).await?.ok_or(AppError::NotFound("user"))?;
    Ok(success(UserProfile::from(found)))
}

/// DELETE /api/users/{id}. Admins cannot delete their own account.
pub async fn delete(
    pool: web::Data<SqlitePool>,
    identity: Identity,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    if id == identity.user_id {
        return Err(AppError::Validation("You cannot delete your own account".to_string()));
    }
    if !user::delete(&pool, id).await? {
        return Err(AppError::NotFound("user"));
    }
    log::info!("user {id} deleted by {}", identity.username);
    Ok(acknowledged("User deleted"))
}

/// GET /api/users/{id}/roles
pub async fn roles(pool: web::Data<SqlitePool>, path: web::Path<i64>) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    if user::find_by_id(&pool, id).await?.is_none() {
        return Err(AppError::NotFound("user"));
    }
    let roles = role::find_by_user(&pool, id).await?;
    Ok(success(serde_json::json!({ "user_id": id, "roles": roles })))
}

/// POST /api/users/{id}/roles: replace the user's whole role set.
pub async fn assign_roles(
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    body: web::Json<AssignRolesRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let role_ids = rbac::assign_roles(&pool, id, &body.role_ids).await?;
    let roles = role::find_by_user(&pool, id).await?;
    Ok(success(serde_json::json!({
        "message": "Roles assigned",
        "user_id": id,
        "role_ids": role_ids,
        "roles": roles,
    })))
}
