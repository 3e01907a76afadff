//! CSV export and import of users, roles and permissions.

mod export;
mod import;
mod types;

pub use export::{permissions_csv, roles_csv, users_csv};
pub use import::{import_permissions, import_roles, import_users};
pub use types::ImportReport;
