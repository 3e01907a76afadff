//! Authorization graph tests: permission resolution through active roles,
//! replace-all assignment, and the reserved-role delete guard.

mod common;

use jing_admin::errors::AppError;
use jing_admin::models::permission::PermissionName;
use jing_admin::models::rbac;
use jing_admin::models::role::{self, NewRole, RoleUpdate};
use common::*;

fn perm(name: &str) -> PermissionName {
    name.parse().expect("valid permission name")
}

async fn make_role(pool: &sqlx::SqlitePool, name: &str, active: bool) -> i64 {
    role::create(
        pool,
        &NewRole {
            name: name.to_string(),
            display_name: name.to_string(),
            description: String::new(),
            status: active,
        },
    )
    .await
    .expect("create role")
}

async fn permission_names(pool: &sqlx::SqlitePool, user_id: i64) -> Vec<String> {
    let mut names: Vec<String> = rbac::permissions_of(pool, user_id)
        .await
        .expect("resolve")
        .into_iter()
        .map(|p| p.name)
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_seeded_admin_holds_every_permission() {
    let db = setup_test_db().await;
    let pool = db.pool();

    let admin = jing_admin::models::user::find_by_username(pool, ADMIN_USER)
        .await
        .expect("query")
        .expect("admin seeded");
    let names = permission_names(pool, admin.id).await;
    assert_eq!(names.len(), 10);
    assert!(rbac::user_has_permission(pool, admin.id, &perm("system.write")).await.expect("check"));
}

#[tokio::test]
async fn test_permission_requires_an_active_role() {
    let db = setup_test_db().await;
    let pool = db.pool();

    let user_id = create_user(pool, "carol", "user").await;
    let editor = make_role(pool, "editor", true).await;
    let auditor = make_role(pool, "auditor", false).await;

    let write = permission_id(pool, "user.write").await;
    let read_roles = permission_id(pool, "role.read").await;
    rbac::assign_permissions(pool, editor, &[write]).await.expect("grant editor");
    rbac::assign_permissions(pool, auditor, &[read_roles]).await.expect("grant auditor");
    rbac::assign_roles(pool, user_id, &[editor, auditor]).await.expect("assign");

    assert!(rbac::user_has_permission(pool, user_id, &perm("user.write")).await.expect("check"));
    // Linked through the inactive role only
    assert!(!rbac::user_has_permission(pool, user_id, &perm("role.read")).await.expect("check"));
    assert_eq!(permission_names(pool, user_id).await, vec!["user.write".to_string()]);

    // Deactivating the remaining role removes the grant without touching the links
    role::update(
        pool,
        editor,
        &RoleUpdate { display_name: "editor".to_string(), description: String::new(), status: false },
    )
    .await
    .expect("deactivate");
    assert!(!rbac::user_has_permission(pool, user_id, &perm("user.write")).await.expect("check"));
    assert_eq!(role::find_by_user(pool, user_id).await.expect("roles").len(), 2);
}

#[tokio::test]
async fn test_resolved_set_is_deduplicated_across_roles() {
    let db = setup_test_db().await;
    let pool = db.pool();

    let user_id = create_user(pool, "dave", "user").await;
    let a = make_role(pool, "role_a", true).await;
    let b = make_role(pool, "role_b", true).await;
    let read = permission_id(pool, "user.read").await;
    let write = permission_id(pool, "user.write").await;
    rbac::assign_permissions(pool, a, &[read, write]).await.expect("grant a");
    rbac::assign_permissions(pool, b, &[read]).await.expect("grant b");
    rbac::assign_roles(pool, user_id, &[a, b]).await.expect("assign");

    assert_eq!(
        permission_names(pool, user_id).await,
        vec!["user.read".to_string(), "user.write".to_string()]
    );
}

#[tokio::test]
async fn test_assign_roles_replaces_and_is_idempotent() {
    let db = setup_test_db().await;
    let pool = db.pool();

    let user_id = create_user(pool, "erin", "user").await;
    let admin_role = role_id(pool, "admin").await;
    let user_role = role_id(pool, "user").await;

    let first = rbac::assign_roles(pool, user_id, &[admin_role, user_role]).await.expect("assign");
    let before = permission_names(pool, user_id).await;
    let second = rbac::assign_roles(pool, user_id, &[user_role, admin_role, admin_role])
        .await
        .expect("assign again");
    assert_eq!(first, second);
    assert_eq!(before, permission_names(pool, user_id).await);

    // Replace, not merge
    rbac::assign_roles(pool, user_id, &[user_role]).await.expect("replace");
    assert_eq!(permission_names(pool, user_id).await, vec!["user.read".to_string()]);

    // Empty set clears everything
    rbac::assign_roles(pool, user_id, &[]).await.expect("clear");
    assert!(permission_names(pool, user_id).await.is_empty());
}

#[tokio::test]
async fn test_unknown_ids_are_skipped() {
    let db = setup_test_db().await;
    let pool = db.pool();

    let user_id = create_user(pool, "frank", "user").await;
    let user_role = role_id(pool, "user").await;
    let linked = rbac::assign_roles(pool, user_id, &[user_role, 9999]).await.expect("assign");
    assert_eq!(linked, vec![user_role]);

    let custom = make_role(pool, "custom", true).await;
    let read = permission_id(pool, "user.read").await;
    let granted = rbac::assign_permissions(pool, custom, &[read, 4242]).await.expect("grant");
    assert_eq!(granted, vec![read]);
}

#[tokio::test]
async fn test_assign_to_missing_owner_is_not_found() {
    let db = setup_test_db().await;
    let pool = db.pool();

    let err = rbac::assign_roles(pool, 9999, &[1]).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound("user")));
    let err = rbac::assign_permissions(pool, 9999, &[1]).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound("role")));
}

#[tokio::test]
async fn test_failed_permission_replace_keeps_old_set() {
    let db = setup_test_db().await;
    let pool = db.pool();

    let custom = make_role(pool, "custom", true).await;
    let read = permission_id(pool, "user.read").await;
    let write = permission_id(pool, "user.write").await;
    let delete = permission_id(pool, "user.delete").await;
    rbac::assign_permissions(pool, custom, &[read, write]).await.expect("initial grant");

    // Abort the transaction partway through the inserts
    sqlx::query(&format!(
        "CREATE TRIGGER fail_grant BEFORE INSERT ON role_permissions \
         WHEN NEW.permission_id = {delete} BEGIN SELECT RAISE(ABORT, 'simulated failure'); END"
    ))
    .execute(pool)
    .await
    .expect("create trigger");

    let result = rbac::assign_permissions(pool, custom, &[read, delete]).await;
    assert!(matches!(result, Err(AppError::Db(_))));

    let kept: Vec<i64> = rbac::permissions_of_role(pool, custom)
        .await
        .expect("read back")
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(kept, vec![read, write]);
}

#[tokio::test]
async fn test_reserved_roles_cannot_be_deleted() {
    let db = setup_test_db().await;
    let pool = db.pool();

    let admin_role = role_id(pool, "admin").await;
    let grants_before = rbac::permissions_of_role(pool, admin_role).await.expect("grants");

    let err = role::delete(pool, admin_role).await.unwrap_err();
    assert!(matches!(err, AppError::ReservedRole(ref name) if name == "admin"));

    assert!(role::find_by_id(pool, admin_role).await.expect("query").is_some());
    assert_eq!(rbac::permissions_of_role(pool, admin_role).await.expect("grants"), grants_before);
}

#[tokio::test]
async fn test_deleting_a_role_removes_its_links() {
    let db = setup_test_db().await;
    let pool = db.pool();

    let user_id = create_user(pool, "gina", "user").await;
    let temp = make_role(pool, "temporary", true).await;
    let write = permission_id(pool, "user.write").await;
    rbac::assign_permissions(pool, temp, &[write]).await.expect("grant");
    rbac::assign_roles(pool, user_id, &[temp]).await.expect("assign");

    role::delete(pool, temp).await.expect("delete");

    assert!(role::find_by_user(pool, user_id).await.expect("roles").is_empty());
    assert!(!rbac::user_has_permission(pool, user_id, &perm("user.write")).await.expect("check"));
    // The permission itself survives
    assert_eq!(permission_id(pool, "user.write").await, write);
}

#[tokio::test]
async fn test_duplicate_role_name_conflicts() {
    let db = setup_test_db().await;
    let pool = db.pool();

    make_role(pool, "reviewer", true).await;
    let err = role::create(
        pool,
        &NewRole {
            name: "reviewer".to_string(),
            display_name: "Again".to_string(),
            description: String::new(),
            status: true,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}
