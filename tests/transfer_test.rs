//! CSV transfer tests: role and permission imports, export round trip.

mod common;

use jing_admin::errors::AppError;
use jing_admin::models::{permission, role};
use jing_admin::transfer;
use common::*;

#[tokio::test]
async fn test_role_import_reports_each_row() {
    let db = setup_test_db().await;
    let pool = db.pool();

    let csv = "name,display_name,description,status\n\
               editor,Editor,Edits content,active\n\
               admin,Administrator,,active\n\
               Bad Name,Broken,,active\n\
               viewer,Viewer,,disabled\n";
    let report = transfer::import_roles(pool, csv.as_bytes()).await.expect("import");

    assert_eq!(report.success, 2);
    assert_eq!(report.failed, 2);
    assert!(report.errors[0].starts_with("row 2:"));
    assert!(report.errors[1].starts_with("row 3:"));

    let viewer = role::find_by_name(pool, "viewer").await.expect("query").expect("imported");
    assert!(!viewer.status);
}

#[tokio::test]
async fn test_permission_import_checks_name_against_parts() {
    let db = setup_test_db().await;
    let pool = db.pool();

    let csv = "name,display_name,resource,action\n\
               report.read,View reports,report,read\n\
               report.write,Manage reports,report,delete\n\
               user.read,View users,user,read\n";
    let report = transfer::import_permissions(pool, csv.as_bytes()).await.expect("import");

    assert_eq!((report.success, report.failed), (1, 2));
    let names: Vec<String> = permission::find_all(pool)
        .await
        .expect("query")
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert!(names.contains(&"report.read".to_string()));
    assert!(!names.contains(&"report.delete".to_string()));
}

#[tokio::test]
async fn test_missing_columns_reject_the_whole_file() {
    let db = setup_test_db().await;
    let pool = db.pool();

    let err = transfer::import_permissions(pool, b"name,display_name\nx.y,X\n")
        .await
        .expect_err("columns missing");
    match err {
        AppError::Validation(msg) => assert!(msg.contains("resource, action"), "{msg}"),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_exported_roles_import_as_duplicates() {
    let db = setup_test_db().await;
    let pool = db.pool();

    let exported = transfer::roles_csv(pool).await.expect("export");
    let report = transfer::import_roles(pool, &exported).await.expect("import");

    let seeded = role::find_all(pool).await.expect("query").len();
    assert_eq!(report.success, 0);
    assert_eq!(report.failed, seeded);
}
