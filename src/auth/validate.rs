/// Validate a username: 3-20 chars, alphanumeric and underscore only.
pub fn validate_username(username: &str) -> Option<String> {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        return Some("Username is required".to_string());
    }
    if trimmed.chars().count() < 3 {
        return Some("Username must be at least 3 characters".to_string());
    }
    if trimmed.chars().count() > 20 {
        return Some("Username must be at most 20 characters".to_string());
    }
    if !trimmed.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Some("Username may only contain letters, numbers, and underscores".to_string());
    }
    None
}

/// Validate an email: must contain '@' and '.', max 254 chars.
pub fn validate_email(email: &str) -> Option<String> {
    let trimmed = email.trim();
    if trimmed.is_empty() {
        return Some("Email is required".to_string());
    }
    if trimmed.len() > 254 {
        return Some("Email must be at most 254 characters".to_string());
    }
    if !trimmed.contains('@') || !trimmed.contains('.') {
        return Some("Email must be a valid address (contain '@' and '.')".to_string());
    }
    None
}

/// Validate a password: min 6 chars.
pub fn validate_password(password: &str) -> Option<String> {
    if password.is_empty() {
        return Some("Password is required".to_string());
    }
    if password.chars().count() < 6 {
        return Some("Password must be at least 6 characters".to_string());
    }
    None
}

/// Validate a role machine name: 2-50 chars, lowercase letters, digits and underscore.
pub fn validate_role_name(name: &str) -> Option<String> {
    let trimmed = name.trim();
    if trimmed.len() < 2 || trimmed.len() > 50 {
        return Some("Role name must be 2-50 characters".to_string());
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Some("Role name may only contain lowercase letters, digits, and underscores".to_string());
    }
    None
}

/// Validate a required text field with a max length.
pub fn validate_required(value: &str, field_name: &str, max_len: usize) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Some(format!("{field_name} is required"));
    }
    if trimmed.chars().count() > max_len {
        return Some(format!("{field_name} must be at most {max_len} characters"));
    }
    None
}

/// Validate an optional text field with a max length (empty is OK).
pub fn validate_optional(value: &str, field_name: &str, max_len: usize) -> Option<String> {
    if value.trim().chars().count() > max_len {
        return Some(format!("{field_name} must be at most {max_len} characters"));
    }
    None
}

/// Collapse collected messages into a single `Validation` error.
pub fn into_result(errors: Vec<String>) -> Result<(), crate::errors::AppError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(crate::errors::AppError::Validation(errors.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames() {
        assert!(validate_username("alice").is_none());
        assert!(validate_username("al").is_some());
        assert!(validate_username("").is_some());
        assert!(validate_username("alice smith").is_some());
        assert!(validate_username("a_very_long_username_indeed").is_some());
    }

    #[test]
    fn emails_and_passwords() {
        assert!(validate_email("alice@x.com").is_none());
        assert!(validate_email("alice").is_some());
        assert!(validate_password("secret1").is_none());
        assert!(validate_password("short").is_some());
    }

    #[test]
    fn role_names() {
        assert!(validate_role_name("editor").is_none());
        assert!(validate_role_name("content_editor_2").is_none());
        assert!(validate_role_name("Editor").is_some());
        assert!(validate_role_name("x").is_some());
    }

    #[test]
    fn collected_errors_join() {
        assert!(into_result(vec![]).is_ok());
        let err = into_result(vec!["a".into(), "b".into()]).unwrap_err();
        assert_eq!(err.to_string(), "a; b");
    }
}
