use std::collections::HashMap;

use csv::{Reader, ReaderBuilder, StringRecord, Trim};
use rand::Rng;
use rand::distr::Alphanumeric;
use sqlx::SqlitePool;

use super::types::{ImportReport, parse_status};
use crate::auth::account::create_account;
use crate::auth::password::hash_password;
use crate::auth::validate::{
    into_result, validate_email, validate_optional, validate_password, validate_required, validate_role_name,
    validate_username,
};
use crate::errors::AppError;
use crate::models::permission::{self, PermissionName};
use crate::models::role::{self, NewRole};
use crate::models::user::{self, NewUser, ProfileFields};

/// Length of the random password given to imported accounts that arrive without one.
const GENERATED_PASSWORD_LEN: usize = 24;

/// Header name to column index. Unknown columns are ignored.
struct Columns(HashMap<String, usize>);

impl Columns {
    /// The trimmed cell under `name`, or "" when the column or the cell is absent.
    fn get<'r>(&self, record: &'r StringRecord, name: &str) -> &'r str {
        self.0
            .get(name)
            .and_then(|&i| record.get(i))
            .unwrap_or_default()
    }
}

fn open<'a>(data: &'a [u8], required: &[&str]) -> Result<(Columns, Reader<&'a [u8]>), AppError> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(data);
    let headers = reader
        .headers()
        .map_err(|e| AppError::Validation(format!("CSV header could not be read: {e}")))?;
    let columns: HashMap<String, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.to_string(), i))
        .collect();

    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|c| !columns.contains_key(*c))
        .collect();
    if !missing.is_empty() {
        return Err(AppError::Validation(format!(
            "CSV is missing required columns: {}",
            missing.join(", ")
        )));
    }
    Ok((Columns(columns), reader))
}

/// Record a row's outcome. Client-side problems reject the row; anything
/// internal aborts the import.
fn settle(report: &mut ImportReport, row: usize, outcome: Result<(), AppError>) -> Result<(), AppError> {
    match outcome {
        Ok(()) => report.imported(),
        Err(e) if e.is_internal() => return Err(e),
        Err(e) => report.reject(row, e),
    }
    Ok(())
}

fn generated_password() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

async fn import_user(pool: &SqlitePool, columns: &Columns, record: &StringRecord) -> Result<(), AppError> {
    let username = columns.get(record, "username");
    let email = columns.get(record, "email");
    let role_label = columns.get(record, "role");
    let password = columns.get(record, "password");

    let mut errors = Vec::new();
    errors.extend(validate_username(username));
    errors.extend(validate_email(email));
    errors.extend(validate_role_name(role_label));
    if !password.is_empty() {
        errors.extend(validate_password(password));
    }
    into_result(errors)?;

    if user::is_taken(pool, username, email).await? {
        return Err(AppError::Conflict(format!("user '{username}' already exists")));
    }

    // Without a password column the account cannot sign in until an admin sets one
    let password = match password {
        "" => generated_password(),
        given => given.to_string(),
    };
    let new = NewUser {
        username: username.to_string(),
        email: email.to_string(),
        password: hash_password(&password)?,
        role: role_label.to_string(),
        status: parse_status(columns.get(record, "status")),
        profile: ProfileFields {
            real_name: columns.get(record, "real_name").to_string(),
            phone: columns.get(record, "phone").to_string(),
            department: columns.get(record, "department").to_string(),
            position: columns.get(record, "position").to_string(),
            bio: columns.get(record, "bio").to_string(),
            ..ProfileFields::default()
        },
    };
    create_account(pool, &new).await?;
    Ok(())
}

/// Required columns: `username`, `email`, `role`, `status`. Optional:
/// `password` and the profile columns written by the export.
pub async fn import_users(pool: &SqlitePool, data: &[u8]) -> Result<ImportReport, AppError> {
    let (columns, mut reader) = open(data, &["username", "email", "role", "status"])?;
    let mut report = ImportReport::default();

    for (index, record) in reader.records().enumerate() {
        let row = index + 1;
        let outcome = match record {
            Ok(record) => import_user(pool, &columns, &record).await,
            Err(e) => Err(AppError::Validation(e.to_string())),
        };
        settle(&mut report, row, outcome)?;
    }

    log::info!("user import: {} imported, {} rejected", report.success, report.failed);
    Ok(report)
}

async fn import_role(pool: &SqlitePool, columns: &Columns, record: &StringRecord) -> Result<(), AppError> {
    let new = NewRole {
        name: columns.get(record, "name").to_string(),
        display_name: columns.get(record, "display_name").to_string(),
        description: columns.get(record, "description").to_string(),
        status: parse_status(columns.get(record, "status")),
    };

    let mut errors = Vec::new();
    errors.extend(validate_role_name(&new.name));
    errors.extend(validate_required(&new.display_name, "Display name", 100));
    errors.extend(validate_optional(&new.description, "Description", 500));
    into_result(errors)?;

    role::create(pool, &new).await?;
    Ok(())
}

/// Required columns: `name`, `display_name`, `status`. Optional: `description`.
pub async fn import_roles(pool: &SqlitePool, data: &[u8]) -> Result<ImportReport, AppError> {
    let (columns, mut reader) = open(data, &["name", "display_name", "status"])?;
    let mut report = ImportReport::default();

    for (index, record) in reader.records().enumerate() {
        let outcome = match record {
            Ok(record) => import_role(pool, &columns, &record).await,
            Err(e) => Err(AppError::Validation(e.to_string())),
        };
        settle(&mut report, index + 1, outcome)?;
    }

    log::info!("role import: {} imported, {} rejected", report.success, report.failed);
    Ok(report)
}

async fn import_permission(pool: &SqlitePool, columns: &Columns, record: &StringRecord) -> Result<(), AppError> {
    let name = columns.get(record, "name");
    let display_name = columns.get(record, "display_name");
    let description = columns.get(record, "description");

    let parsed = PermissionName::new(columns.get(record, "resource"), columns.get(record, "action"))?;
    if name != parsed.as_str() {
        return Err(AppError::Validation(format!(
            "name '{name}' does not match resource and action ('{parsed}')"
        )));
    }
    let mut errors = Vec::new();
    errors.extend(validate_required(display_name, "Display name", 100));
    errors.extend(validate_optional(description, "Description", 500));
    into_result(errors)?;

    permission::create(pool, &parsed, display_name, description).await?;
    Ok(())
}

/// Required columns: `name`, `display_name`, `resource`, `action`. Optional:
/// `description`. `name` must read `<resource>.<action>`.
pub async fn import_permissions(pool: &SqlitePool, data: &[u8]) -> Result<ImportReport, AppError> {
    let (columns, mut reader) = open(data, &["name", "display_name", "resource", "action"])?;
    let mut report = ImportReport::default();

    for (index, record) in reader.records().enumerate() {
        let outcome = match record {
            Ok(record) => import_permission(pool, &columns, &record).await,
            Err(e) => Err(AppError::Validation(e.to_string())),
        };
        settle(&mut report, index + 1, outcome)?;
    }

    log::info!("permission import: {} imported, {} rejected", report.success, report.failed);
    Ok(report)
}
