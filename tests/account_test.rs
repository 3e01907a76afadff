//! Account lifecycle tests: registration, login, password change.

mod common;

use actix_web::ResponseError;
use jing_admin::auth::account::{self, Registration};
use jing_admin::auth::password;
use jing_admin::errors::AppError;
use jing_admin::models::{rbac, user};
use common::*;

fn alice() -> Registration<'static> {
    Registration {
        username: "alice",
        email: "alice@x.com",
        password: "secret1",
        role: None,
    }
}

#[tokio::test]
async fn test_register_then_login_scenario() {
    let db = setup_test_db().await;
    let pool = db.pool();
    let codec = test_codec();

    let session = account::register(pool, &codec, alice()).await.expect("register");
    assert!(!session.token.is_empty());
    assert_eq!(session.user_info.username, "alice");
    assert_eq!(session.user_info.role, "user");
    assert!(session.user_info.last_login.is_none());

    let body = serde_json::to_value(&session).expect("serialize");
    assert!(body["user_info"].get("password").is_none());

    let claims = codec.validate(&session.token).expect("token valid");
    assert_eq!(claims.user_id, session.user_info.id);
    assert_eq!(claims.username, "alice");

    let dup = account::register(pool, &codec, alice()).await.unwrap_err();
    assert!(matches!(dup, AppError::Conflict(_)));

    let wrong = account::login(pool, &codec, "alice", "wrong").await.unwrap_err();
    assert!(matches!(wrong, AppError::InvalidCredentials));

    let ok = account::login(pool, &codec, "alice", "secret1").await.expect("login");
    assert!(ok.user_info.last_login.is_some());
}

#[tokio::test]
async fn test_login_trims_username_like_register() {
    let db = setup_test_db().await;
    let pool = db.pool();
    let codec = test_codec();

    account::register(pool, &codec, Registration { username: "  alice ", ..alice() })
        .await
        .expect("register");
    let session = account::login(pool, &codec, " alice  ", "secret1").await.expect("login");
    assert_eq!(session.user_info.username, "alice");
}

#[tokio::test]
async fn test_duplicate_email_conflicts() {
    let db = setup_test_db().await;
    let pool = db.pool();
    let codec = test_codec();

    account::register(pool, &codec, alice()).await.expect("register");
    let err = account::register(
        pool,
        &codec,
        Registration { username: "alice2", ..alice() },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn test_unknown_user_and_wrong_password_look_the_same() {
    let db = setup_test_db().await;
    let pool = db.pool();
    let codec = test_codec();
    account::register(pool, &codec, alice()).await.expect("register");

    let wrong_password = account::login(pool, &codec, "alice", "nope!!").await.unwrap_err();
    let unknown_user = account::login(pool, &codec, "nobody", "secret1").await.unwrap_err();

    assert_eq!(wrong_password.status_code(), unknown_user.status_code());
    assert_eq!(wrong_password.to_string(), unknown_user.to_string());
}

#[tokio::test]
async fn test_disabled_account_is_rejected_after_password_check() {
    let db = setup_test_db().await;
    let pool = db.pool();
    let codec = test_codec();

    let session = account::register(pool, &codec, alice()).await.expect("register");
    sqlx::query("UPDATE users SET status = 0 WHERE id = ?")
        .bind(session.user_info.id)
        .execute(pool)
        .await
        .expect("disable");

    let right = account::login(pool, &codec, "alice", "secret1").await.unwrap_err();
    assert!(matches!(right, AppError::AccountDisabled));

    // A wrong password does not reveal the disabled state
    let wrong = account::login(pool, &codec, "alice", "wrong1").await.unwrap_err();
    assert!(matches!(wrong, AppError::InvalidCredentials));
}

#[tokio::test]
async fn test_register_validates_input() {
    let db = setup_test_db().await;
    let pool = db.pool();
    let codec = test_codec();

    let err = account::register(
        pool,
        &codec,
        Registration { username: "al", email: "bad", password: "123", role: None },
    )
    .await
    .unwrap_err();
    match err {
        AppError::Validation(msg) => {
            assert!(msg.contains("Username"));
            assert!(msg.contains("Email"));
            assert!(msg.contains("Password"));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_registered_user_is_linked_to_matching_role() {
    let db = setup_test_db().await;
    let pool = db.pool();
    let codec = test_codec();

    let session = account::register(pool, &codec, alice()).await.expect("register");
    let names: Vec<String> = rbac::permissions_of(pool, session.user_info.id)
        .await
        .expect("resolve")
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(names, vec!["user.read".to_string()]);
}

#[tokio::test]
async fn test_failed_role_link_leaves_no_account_behind() {
    let db = setup_test_db().await;
    let pool = db.pool();
    let codec = test_codec();

    sqlx::query(
        "CREATE TRIGGER fail_link BEFORE INSERT ON user_roles \
         BEGIN SELECT RAISE(ABORT, 'simulated failure'); END",
    )
    .execute(pool)
    .await
    .expect("create trigger");

    let err = account::register(pool, &codec, alice()).await.unwrap_err();
    assert!(matches!(err, AppError::Db(_)));
    assert!(user::find_by_username(pool, "alice").await.expect("query").is_none());

    sqlx::query("DROP TRIGGER fail_link").execute(pool).await.expect("drop trigger");

    // The retry is not blocked by a half-created account
    let session = account::register(pool, &codec, alice()).await.expect("register again");
    let held = rbac::permissions_of(pool, session.user_info.id).await.expect("resolve");
    assert_eq!(held.len(), 1);
}

#[tokio::test]
async fn test_change_password() {
    let db = setup_test_db().await;
    let pool = db.pool();
    let codec = test_codec();
    let id = account::register(pool, &codec, alice()).await.expect("register").user_info.id;

    let err = account::change_password(pool, id, "not-it", "newpass1").await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = account::change_password(pool, id, "secret1", "short").await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    account::change_password(pool, id, "secret1", "newpass1").await.expect("change");
    let stored = user::find_by_id(pool, id).await.expect("query").expect("exists");
    assert!(password::verify_password("newpass1", &stored.password));
    assert!(!password::verify_password("secret1", &stored.password));

    account::login(pool, &codec, "alice", "newpass1").await.expect("login with new password");
}

#[tokio::test]
async fn test_seeded_admin_can_log_in() {
    let db = setup_test_db().await;
    let session = account::login(db.pool(), &test_codec(), ADMIN_USER, ADMIN_PASS)
        .await
        .expect("admin login");
    assert_eq!(session.user_info.role, "admin");
}
