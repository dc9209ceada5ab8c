//! Input validation utilities

use regex::Regex;
use std::sync::OnceLock;

use crate::error::{AuthError, AuthResult};

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 32;
pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 128;
const NAME_MAX_LEN: usize = 100;

/// Validate username
pub fn validate_username(username: &str) -> AuthResult<()> {
    let invalid = |message: &str| Err(AuthError::validation("username", message));

    if username.is_empty() {
        return invalid("Username is required");
    }

    if username.len() < USERNAME_MIN_LEN {
        return invalid("Username must be at least 3 characters long");
    }

    if username.len() > USERNAME_MAX_LEN {
        return invalid("Username must be at most 32 characters long");
    }

    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = USERNAME_REGEX
        .get_or_init(|| Regex::new(r"^[a-zA-Z0-9_]+$").expect("Failed to compile username regex"));

    if !regex.is_match(username) {
        return invalid("Username can only contain letters, numbers, and underscores");
    }

    Ok(())
}

/// Validate email
pub fn validate_email(email: &str) -> AuthResult<()> {
    let invalid = |message: &str| Err(AuthError::validation("email", message));

    if email.is_empty() {
        return invalid("Email is required");
    }

    if email.len() > 254 {
        return invalid("Email must be at most 254 characters long");
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return invalid("Invalid email format");
    }

    Ok(())
}

/// Validate password
///
/// Requires a letter and a digit; symbols are allowed but not required.
pub fn validate_password(password: &str) -> AuthResult<()> {
    let invalid = |message: &str| Err(AuthError::validation("password", message));

    if password.is_empty() {
        return invalid("Password is required");
    }

    if password.chars().count() < PASSWORD_MIN_LEN {
        return invalid("Password must be at least 8 characters long");
    }

    if password.chars().count() > PASSWORD_MAX_LEN {
        return invalid("Password must be at most 128 characters long");
    }

    let has_letter = password.chars().any(char::is_alphabetic);
    let has_digit = password.chars().any(|c| c.is_ascii_digit());

    if !has_letter {
        return invalid("Password must contain at least one letter");
    }

    if !has_digit {
        return invalid("Password must contain at least one digit");
    }

    Ok(())
}

/// Validate a person name part such as a first or last name
pub fn validate_name(field: &'static str, value: &str) -> AuthResult<()> {
    let trimmed = value.trim();

    if trimmed.is_empty() {
        return Err(AuthError::validation(field, format!("{field} is required")));
    }

    if trimmed.chars().count() > NAME_MAX_LEN {
        return Err(AuthError::validation(
            field,
            format!("{field} must be at most {NAME_MAX_LEN} characters long"),
        ));
    }

    static NAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = NAME_REGEX
        .get_or_init(|| Regex::new(r"^[\p{L} .'-]+$").expect("Failed to compile name regex"));

    if !regex.is_match(trimmed) {
        return Err(AuthError::validation(
            field,
            format!("{field} contains invalid characters"),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(result: AuthResult<()>) -> &'static str {
        match result {
            Err(AuthError::Validation { field, .. }) => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_username_rules() {
        assert!(validate_username("erikabiancaapi2").is_ok());
        assert!(validate_username("jd_2024").is_ok());
        assert_eq!(field_of(validate_username("ab")), "username");
        assert_eq!(field_of(validate_username("john doe")), "username");
        assert_eq!(field_of(validate_username(&"a".repeat(33))), "username");
    }

    #[test]
    fn test_email_rules() {
        assert!(validate_email("juan.delacruz@example.com").is_ok());
        assert_eq!(field_of(validate_email("")), "email");
        assert_eq!(field_of(validate_email("not-an-email")), "email");
        assert_eq!(field_of(validate_email("a@b")), "email");
    }

    #[test]
    fn test_password_rules() {
        assert!(validate_password("delacruz123!").is_ok());
        assert!(validate_password("abcdefg1").is_ok());
        assert_eq!(field_of(validate_password("short1")), "password");
        assert_eq!(field_of(validate_password("allletters")), "password");
        assert_eq!(field_of(validate_password("12345678")), "password");
    }

    #[test]
    fn test_name_rules() {
        assert!(validate_name("first_name", "Juan").is_ok());
        assert!(validate_name("last_name", "Dela Cruz").is_ok());
        assert!(validate_name("last_name", "O'Brien-Núñez").is_ok());
        assert_eq!(field_of(validate_name("first_name", "  ")), "first_name");
        assert_eq!(field_of(validate_name("first_name", "R2D2")), "first_name");
    }
}
