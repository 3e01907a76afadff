use std::fmt::Display;

use serde::Serialize;

/// Outcome of a CSV import. Rows are independent: a rejected row is reported
/// and the rest still go in.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    pub success: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

impl ImportReport {
    pub(super) fn imported(&mut self) {
        self.success += 1;
    }

    /// `row` counts data rows from 1; the header is not a row.
    pub(super) fn reject(&mut self, row: usize, reason: impl Display) {
        self.failed += 1;
        self.errors.push(format!("row {row}: {reason}"));
    }
}

pub(super) const USER_COLUMNS: [&str; 12] = [
    "id",
    "username",
    "email",
    "role",
    "status",
    "real_name",
    "phone",
    "department",
    "position",
    "bio",
    "last_login",
    "created_at",
];

pub(super) const ROLE_COLUMNS: [&str; 6] = ["id", "name", "display_name", "description", "status", "created_at"];

pub(super) const PERMISSION_COLUMNS: [&str; 7] =
    ["id", "name", "display_name", "resource", "action", "description", "created_at"];

pub(super) fn status_label(active: bool) -> &'static str {
    if active { "active" } else { "disabled" }
}

/// Accepts what `status_label` writes plus the common boolean spellings.
pub(super) fn parse_status(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "active" | "enabled" | "1" | "true"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips() {
        assert!(parse_status(status_label(true)));
        assert!(!parse_status(status_label(false)));
        assert!(parse_status(" TRUE "));
        assert!(!parse_status(""));
    }

    #[test]
    fn rejections_are_counted_and_numbered() {
        let mut report = ImportReport::default();
        report.imported();
        report.reject(2, "bad email");
        assert_eq!(report.success, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.errors, vec!["row 2: bad email".to_string()]);
    }
}
