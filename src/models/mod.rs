pub mod monitor;
pub mod operation_log;
pub mod permission;
pub mod rbac;
pub mod role;
pub mod setting;
pub mod user;

/// True when a write failed on a UNIQUE constraint.
pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => db.is_unique_violation(),
        _ => false,
    }
}
