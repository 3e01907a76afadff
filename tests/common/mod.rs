//! Shared test infrastructure.
//!
//! `setup_test_db()` gives every test its own in-memory database with the
//! schema applied and the default data seeded (permissions, reserved roles,
//! system configuration, admin account).

#![allow(dead_code)]

use sqlx::SqlitePool;

use jing_admin::auth::password;
use jing_admin::auth::token::TokenCodec;
use jing_admin::db;
use jing_admin::models::user::{self, NewUser, ProfileFields};

pub const ADMIN_USER: &str = "admin";
pub const ADMIN_PASS: &str = "admin123";
pub const TEST_SECRET: &[u8] = b"test-secret-key-that-is-at-least-32-bytes";
pub const TEST_ISSUER: &str = "jing-admin";

pub struct TestDb {
    pool: SqlitePool,
}

impl TestDb {
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

pub async fn setup_test_db() -> TestDb {
    let pool = db::connect_in_memory().await.expect("Failed to open test DB");
    db::run_migrations(&pool).await.expect("Failed to run migrations");
    db::seed(&pool, ADMIN_PASS).await.expect("Failed to seed test DB");
    TestDb { pool }
}

pub fn test_codec() -> TokenCodec {
    TokenCodec::new(TEST_SECRET, TEST_ISSUER)
}

/// Insert a user directly, bypassing graph linking. Returns the new id.
pub async fn create_user(pool: &SqlitePool, username: &str, role_label: &str) -> i64 {
    let new_user = NewUser {
        username: username.to_string(),
        email: format!("{username}@example.com"),
        password: password::hash_password("secret1").expect("hash"),
        role: role_label.to_string(),
        status: true,
        profile: ProfileFields::default(),
    };
    user::create(pool, &new_user).await.expect("create user")
}

pub async fn permission_id(pool: &SqlitePool, name: &str) -> i64 {
    sqlx::query_scalar("SELECT id FROM permissions WHERE name = ?")
        .bind(name)
        .fetch_one(pool)
        .await
        .expect("permission exists")
}

pub async fn role_id(pool: &SqlitePool, name: &str) -> i64 {
    sqlx::query_scalar("SELECT id FROM roles WHERE name = ?")
        .bind(name)
        .fetch_one(pool)
        .await
        .expect("role exists")
}
