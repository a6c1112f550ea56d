//! Input validation for user-supplied fields.
//!
//! Every check runs before anything touches storage. Failures carry the field
//! name and a human-readable reason suitable for showing to the operator.

use crate::{
    Result,
    constants::{
        MAX_AUTHOR_LENGTH, MAX_EMAIL_LENGTH, MAX_ISBN_LENGTH, MAX_NAME_LENGTH, MAX_TITLE_LENGTH,
        MIN_PASSWORD_LENGTH,
    },
    error::Error,
};

fn require_text(field: &'static str, value: &str, max_len: usize) -> Result<()> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid(field, "must not be empty"));
    }
    let len = trimmed.chars().count();
    if len > max_len {
        return Err(Error::invalid(
            field,
            format!("must be at most {max_len} characters, got {len}"),
        ));
    }
    Ok(())
}

/// Canonical form of an email address: trimmed and lowercased.
///
/// Email is the login key, so registration and authentication both match
/// on this form.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_name(name: &str) -> Result<()> {
    require_text("name", name, MAX_NAME_LENGTH)
}

/// Validate an email address.
///
/// Requires exactly one `@` with non-empty local and domain parts and no
/// whitespace. Deliverability is not checked.
pub fn validate_email(email: &str) -> Result<()> {
    require_text("email", email, MAX_EMAIL_LENGTH)?;

    let email = email.trim();
    if email.chars().any(char::is_whitespace) {
        return Err(Error::invalid("email", "must not contain whitespace"));
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            Ok(())
        }
        _ => Err(Error::invalid("email", "must look like local@domain")),
    }
}

pub fn validate_password(password: &str) -> Result<()> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LENGTH {
        return Err(Error::invalid(
            "password",
            format!("must be at least {MIN_PASSWORD_LENGTH} characters"),
        ));
    }
    Ok(())
}

pub fn validate_isbn(isbn: &str) -> Result<()> {
    require_text("isbn", isbn, MAX_ISBN_LENGTH)?;
    if isbn.trim().chars().any(char::is_whitespace) {
        return Err(Error::invalid("isbn", "must not contain whitespace"));
    }
    Ok(())
}

pub fn validate_title(title: &str) -> Result<()> {
    require_text("title", title, MAX_TITLE_LENGTH)
}

pub fn validate_author(author: &str) -> Result<()> {
    require_text("author", author, MAX_AUTHOR_LENGTH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("ann@x.edu")]
    #[case("  Ann.Lee@Library.Example.org ")]
    #[case("a@b")]
    fn test_valid_emails(#[case] email: &str) {
        assert!(validate_email(email).is_ok());
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("ann")]
    #[case("@x.edu")]
    #[case("ann@")]
    #[case("ann@@x.edu")]
    #[case("ann lee@x.edu")]
    fn test_invalid_emails(#[case] email: &str) {
        let err = validate_email(email).unwrap_err();
        assert!(matches!(err, Error::InvalidField { field: "email", .. }));
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ann@X.EDU "), "ann@x.edu");
    }

    #[rstest]
    #[case("secret", true)]
    #[case("secret1", true)]
    #[case("short", false)]
    #[case("", false)]
    fn test_password_length(#[case] password: &str, #[case] ok: bool) {
        assert_eq!(validate_password(password).is_ok(), ok);
    }

    #[test]
    fn test_name_limits() {
        assert!(validate_name("Ann").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name(&"x".repeat(MAX_NAME_LENGTH)).is_ok());
        assert!(validate_name(&"x".repeat(MAX_NAME_LENGTH + 1)).is_err());
    }

    #[rstest]
    #[case("978-0-13-110362-7", true)]
    #[case("ISBN-1", true)]
    #[case("", false)]
    #[case("978 0 13", false)]
    fn test_isbn(#[case] isbn: &str, #[case] ok: bool) {
        assert_eq!(validate_isbn(isbn).is_ok(), ok);
    }

    #[test]
    fn test_title_and_author_reject_blank() {
        assert!(validate_title(" ").is_err());
        assert!(validate_author("\t").is_err());
        assert!(validate_title("The C Programming Language").is_ok());
        assert!(validate_author("Kernighan & Ritchie").is_ok());
    }
}
