use sqlx::{Sqlite, SqlitePool};

use super::types::{NewUser, ProfileFields, User, UserUpdate};

const SELECT_USER: &str = "\
    SELECT id, username, email, password, role, status, \
           real_name, phone, avatar, department, position, bio, \
           last_login, created_at, updated_at \
    FROM users";

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("{SELECT_USER} WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Exact, case-sensitive lookup used by login.
pub async fn find_by_username(pool: &SqlitePool, username: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("{SELECT_USER} WHERE username = ?"))
        .bind(username)
        .fetch_optional(pool)
        .await
}

pub async fn find_all(pool: &SqlitePool) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("{SELECT_USER} ORDER BY id"))
        .fetch_all(pool)
        .await
}

pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await
}

/// Whether either the username or the email already belongs to some account.
pub async fn is_taken(pool: &SqlitePool, username: &str, email: &str) -> Result<bool, sqlx::Error> {
    let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ? OR email = ?")
        .bind(username)
        .bind(email)
        .fetch_one(pool)
        .await?;
    Ok(n > 0)
}

/// Whether `email` belongs to an account other than `user_id`.
pub async fn email_taken_by_other(pool: &SqlitePool, email: &str, user_id: i64) -> Result<bool, sqlx::Error> {
    let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ? AND id <> ?")
        .bind(email)
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    Ok(n > 0)
}

pub async fn create<'e, E>(executor: E, new: &NewUser) -> Result<i64, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "INSERT INTO users \
             (username, email, password, role, status, real_name, phone, avatar, department, position, bio) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&new.username)
    .bind(&new.email)
    .bind(&new.password)
    .bind(&new.role)
    .bind(new.status)
    .bind(&new.profile.real_name)
    .bind(&new.profile.phone)
    .bind(&new.profile.avatar)
    .bind(&new.profile.department)
    .bind(&new.profile.position)
    .bind(&new.profile.bio)
    .execute(executor)
    .await?;
    Ok(result.last_insert_rowid())
}

/// Returns false when no such user exists.
pub async fn update(pool: &SqlitePool, id: i64, upd: &UserUpdate) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE users SET \
             email = ?, role = ?, status = ?, \
             real_name = ?, phone = ?, avatar = ?, department = ?, position = ?, bio = ?, \
             password = COALESCE(?, password), \
             updated_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now') \
         WHERE id = ?",
    )
    .bind(&upd.email)
    .bind(&upd.role)
    .bind(upd.status)
    .bind(&upd.profile.real_name)
    .bind(&upd.profile.phone)
    .bind(&upd.profile.avatar)
    .bind(&upd.profile.department)
    .bind(&upd.profile.position)
    .bind(&upd.profile.bio)
    .bind(upd.password.as_deref())
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Self-service profile update; username and role label are not touched.
pub async fn update_profile(
    pool: &SqlitePool,
    id: i64,
    email: &str,
    profile: &ProfileFields,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE users SET \
             email = ?, real_name = ?, phone = ?, avatar = ?, department = ?, position = ?, bio = ?, \
             updated_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now') \
         WHERE id = ?",
    )
    .bind(email)
    .bind(&profile.real_name)
    .bind(&profile.phone)
    .bind(&profile.avatar)
    .bind(&profile.department)
    .bind(&profile.position)
    .bind(&profile.bio)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn update_password(pool: &SqlitePool, id: i64, hash: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE users SET password = ?, updated_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now') WHERE id = ?",
    )
    .bind(hash)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn touch_last_login(pool: &SqlitePool, id: i64) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE users SET \
             last_login = strftime('%Y-%m-%dT%H:%M:%SZ', 'now'), \
             updated_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now') \
         WHERE id = ?",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Hard delete; role links go with it through the cascade.
pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
