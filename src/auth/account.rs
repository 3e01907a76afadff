//! Account lifecycle: registration, login and password rotation.

use serde::Serialize;
use sqlx::SqlitePool;

use super::password::{hash_password, verify_password};
use super::token::TokenCodec;
use super::validate::{into_result, validate_email, validate_password, validate_role_name, validate_username};
use crate::errors::AppError;
use crate::models::user::{self, DEFAULT_ROLE_LABEL, NewUser, ProfileFields, UserProfile};
use crate::models::{is_unique_violation, rbac, role};

/// What a successful register or login hands back to the client.
#[derive(Debug, Serialize)]
pub struct Session {
    pub token: String,
    pub user_info: UserProfile,
}

pub struct Registration<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub role: Option<&'a str>,
}

/// Persist a new account and link it to the graph role matching its label, if one exists.
/// Both writes share one transaction. `password` must already be hashed.
pub async fn create_account(pool: &SqlitePool, new: &NewUser) -> Result<i64, AppError> {
    let graph_role = role::find_by_name(pool, &new.role).await?;

    let mut tx = pool.begin().await?;
    let id = user::create(&mut *tx, new).await.map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("username or email already exists".to_string())
        } else {
            AppError::Db(e)
        }
    })?;
    if let Some(r) = graph_role {
        rbac::link_role(&mut *tx, id, r.id).await?;
    }
    tx.commit().await?;
    Ok(id)
}

pub async fn register(pool: &SqlitePool, codec: &TokenCodec, reg: Registration<'_>) -> Result<Session, AppError> {
    let username = reg.username.trim();
    let email = reg.email.trim();
    let role_label = reg
        .role
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or(DEFAULT_ROLE_LABEL);

    let mut errors = Vec::new();
    errors.extend(validate_username(username));
    errors.extend(validate_email(email));
    errors.extend(validate_password(reg.password));
    errors.extend(validate_role_name(role_label));
    into_result(errors)?;

    if user::is_taken(pool, username, email).await? {
        return Err(AppError::Conflict("username or email already exists".to_string()));
    }

    let new = NewUser {
        username: username.to_string(),
        email: email.to_string(),
        password: hash_password(reg.password)?,
        role: role_label.to_string(),
        status: true,
        profile: ProfileFields::default(),
    };
    let id = create_account(pool, &new).await?;
    log::info!("registered user '{username}' ({id})");

    let created = user::find_by_id(pool, id).await?.ok_or(AppError::NotFound("user"))?;
    let token = codec.issue(&created.identity())?;
    Ok(Session { token, user_info: created.into() })
}

/// Verify credentials and mint a session.
///
/// The username is trimmed the same way registration trims it. An unknown
/// username and a wrong password fail identically. The disabled check only
/// runs once the password has matched.
pub async fn login(pool: &SqlitePool, codec: &TokenCodec, username: &str, password: &str) -> Result<Session, AppError> {
    let found = user::find_by_username(pool, username.trim()).await?;
    let account = match found {
        Some(u) if verify_password(password, &u.password) => u,
        _ => return Err(AppError::InvalidCredentials),
    };

    if !account.status {
        log::info!("login refused for disabled user {}", account.id);
        return Err(AppError::AccountDisabled);
    }

    user::touch_last_login(pool, account.id).await?;
    let account = user::find_by_id(pool, account.id)
        .await?
        .ok_or(AppError::NotFound("user"))?;

    let token = codec.issue(&account.identity())?;
    log::info!("user '{}' logged in", account.username);
    Ok(Session { token, user_info: account.into() })
}

pub async fn change_password(
    pool: &SqlitePool,
    user_id: i64,
    current_password: &str,
    new_password: &str,
) -> Result<(), AppError> {
    into_result(validate_password(new_password).into_iter().collect())?;

    let account = user::find_by_id(pool, user_id)
        .await?
        .ok_or(AppError::NotFound("user"))?;
    if !verify_password(current_password, &account.password) {
        return Err(AppError::Validation("Current password is incorrect".to_string()));
    }

    user::update_password(pool, user_id, &hash_password(new_password)?).await?;
    log::info!("user {user_id} changed password");
    Ok(())
}
