//! Input validation shared by accounts and the course catalog

use regex::Regex;
use std::sync::OnceLock;

use crate::auth::models::{Gender, UserRole};
use crate::courses::models::DEFAULT_CURRENCY;
use crate::error::{Error, Result};

pub const MIN_PASSWORD_LENGTH: usize = 8;

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email pattern")
    })
}

/// Require a present, well-formed email address
pub fn validate_email(email: Option<&str>) -> Result<&str> {
    let email = required(email, "Email is required")?;
    if !email_pattern().is_match(email) {
        return Err(Error::validation("Invalid email format"));
    }
    Ok(email)
}

/// Require a password of at least [`MIN_PASSWORD_LENGTH`] characters,
/// matching `confirm` when one is given
pub fn validate_password<'a>(password: Option<&'a str>, confirm: Option<&str>) -> Result<&'a str> {
    let password = required(password, "Password is required")?;
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(Error::validation(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        )));
    }
    if confirm.is_some_and(|c| c != password) {
        return Err(Error::validation("Passwords do not match"));
    }
    Ok(password)
}

/// Role for a self-registering user; absent means student
pub fn registration_role(role: Option<&str>) -> Result<UserRole> {
    let Some(role) = role else {
        return Ok(UserRole::Student);
    };
    role.parse::<UserRole>()
        .ok()
        .filter(|r| UserRole::SELF_REGISTERED.contains(r))
        .ok_or_else(|| Error::validation("Role must be one of: student, teacher, parent"))
}

/// Optional gender; empty strings count as absent
pub fn parse_gender(gender: Option<&str>) -> Result<Option<Gender>> {
    match gender.filter(|g| !g.is_empty()) {
        None => Ok(None),
        Some(g) => g
            .parse::<Gender>()
            .map(Some)
            .map_err(|_| Error::validation("Invalid gender value")),
    }
}

pub fn validate_price(price: i64) -> Result<i64> {
    if price < 0 {
        return Err(Error::validation("Price cannot be negative"));
    }
    Ok(price)
}

/// Only VND is accepted; absent means VND
pub fn validate_currency(currency: Option<&str>) -> Result<String> {
    match currency {
        None => Ok(DEFAULT_CURRENCY.to_string()),
        Some(c) if c == DEFAULT_CURRENCY => Ok(c.to_string()),
        Some(_) => Err(Error::validation(format!(
            "Currency code must be {}",
            DEFAULT_CURRENCY
        ))),
    }
}

/// Non-empty string or a validation error carrying `message`
pub fn required<'a>(value: Option<&'a str>, message: &str) -> Result<&'a str> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| Error::validation(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_validation() {
        assert!(validate_email(Some("alice@example.com")).is_ok());
        assert!(validate_email(Some("a.b+tag@sub.example.vn")).is_ok());
        assert!(validate_email(Some("no-at-sign.com")).is_err());
        assert!(validate_email(Some("alice@example")).is_err());
        assert!(validate_email(Some("alice@example.c")).is_err());

        let err = validate_email(None).unwrap_err();
        assert_eq!(err.to_string(), "Email is required");
    }

    #[test]
    fn test_password_rules() {
        assert!(validate_password(Some("longenough"), None).is_ok());
        assert_eq!(
            validate_password(Some("short"), None).unwrap_err().to_string(),
            "Password must be at least 8 characters long"
        );
        assert_eq!(
            validate_password(Some("longenough"), Some("different"))
                .unwrap_err()
                .to_string(),
            "Passwords do not match"
        );
        assert!(validate_password(Some("longenough"), Some("longenough")).is_ok());
        assert!(validate_password(Some(""), None).is_err());
    }

    #[test]
    fn test_registration_role() {
        assert_eq!(registration_role(None).unwrap(), UserRole::Student);
        assert_eq!(registration_role(Some("teacher")).unwrap(), UserRole::Teacher);
        assert_eq!(registration_role(Some("parent")).unwrap(), UserRole::Parent);
        assert!(registration_role(Some("admin")).is_err());
        assert!(registration_role(Some("Teacher")).is_err());
    }

    #[test]
    fn test_gender() {
        assert_eq!(parse_gender(None).unwrap(), None);
        assert_eq!(parse_gender(Some("")).unwrap(), None);
        assert_eq!(parse_gender(Some("female")).unwrap(), Some(Gender::Female));
        assert!(parse_gender(Some("unknown")).is_err());
    }

    #[test]
    fn test_price_and_currency() {
        assert_eq!(validate_price(0).unwrap(), 0);
        assert!(validate_price(-1).is_err());
        assert_eq!(validate_currency(None).unwrap(), "VND");
        assert_eq!(validate_currency(Some("VND")).unwrap(), "VND");
        assert!(validate_currency(Some("USD")).is_err());
    }
}
