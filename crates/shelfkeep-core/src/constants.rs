//! Core constants for the shelfkeep lending tracker.
//!
//! This module defines the fixed policy values shared by every crate in the
//! workspace: loan period, credential format, borrow limits per role, user id
//! allocation and input length limits. Keeping them in one place guarantees
//! that the storage schema, the lending engine and the command line agree.
//!
//! # Usage
//!
//! Constants are organized by category for easy discovery:
//!
//! ```
//! use shelfkeep_core::constants::*;
//!
//! // Loan policy
//! assert_eq!(LOAN_PERIOD_DAYS, 14);
//!
//! // Credential format
//! assert_eq!(SALT_LENGTH, 16);
//! assert_eq!(SALT_SEPARATOR, ':');
//! ```

// ============================================================================
// Loan Policy
// ============================================================================

/// Number of days between the borrow date and the due date of a loan.
///
/// # Examples
///
/// ```
/// use chrono::{Duration, Utc};
/// use shelfkeep_core::constants::LOAN_PERIOD_DAYS;
///
/// let borrowed = Utc::now();
/// let due = borrowed + Duration::days(LOAN_PERIOD_DAYS);
/// assert!(due > borrowed);
/// ```
pub const LOAN_PERIOD_DAYS: i64 = 14;

// ============================================================================
// Credential Format
// ============================================================================

/// Length of the random salt generated for every stored credential.
pub const SALT_LENGTH: usize = 16;

/// Separator between the salt and the hex digest in a stored credential.
///
/// The salt alphabet is alphanumeric and the digest is lowercase hex, so the
/// separator can never appear inside either part.
///
/// # Protocol Position
///
/// ```text
/// aZ3kP0qLm9XcV2bN:5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8
/// ^^^^^^^^^^^^^^^^ ^
/// salt             separator
/// ```
pub const SALT_SEPARATOR: char = ':';

/// Length of a SHA-256 digest rendered as lowercase hex.
pub const DIGEST_HEX_LENGTH: usize = 64;

/// Minimum accepted length for a plain-text password at registration.
pub const MIN_PASSWORD_LENGTH: usize = 6;

// ============================================================================
// Borrow Limits
// ============================================================================

/// Maximum simultaneous open loans for a student.
pub const STUDENT_MAX_BOOKS: u32 = 5;

/// Maximum simultaneous open loans for a faculty member.
pub const FACULTY_MAX_BOOKS: u32 = 15;

/// Maximum simultaneous open loans for librarians, head librarian included.
pub const LIBRARIAN_MAX_BOOKS: u32 = 10;

// ============================================================================
// User Identifiers
// ============================================================================

/// Id prefix for student accounts.
pub const STUDENT_ID_PREFIX: &str = "STU";

/// Id prefix for faculty accounts.
pub const FACULTY_ID_PREFIX: &str = "FAC";

/// Id prefix for librarian and head librarian accounts.
pub const LIBRARIAN_ID_PREFIX: &str = "LIB";

/// First numeric suffix handed out for a prefix.
///
/// Suffixes are allocated monotonically per prefix, so the first student is
/// `STU100`, the second `STU101`, and so on.
///
/// # Examples
///
/// ```
/// use shelfkeep_core::constants::{STUDENT_ID_PREFIX, USER_ID_FIRST_SEQUENCE};
///
/// let first = format!("{STUDENT_ID_PREFIX}{USER_ID_FIRST_SEQUENCE}");
/// assert_eq!(first, "STU100");
/// ```
pub const USER_ID_FIRST_SEQUENCE: i64 = 100;

// ============================================================================
// Field Length Limits
// ============================================================================

/// Maximum length of a user's display name.
pub const MAX_NAME_LENGTH: usize = 100;

/// Maximum length of an email address (RFC 5321 path limit).
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Maximum length of an ISBN key.
///
/// Generous enough for ISBN-13 with hyphens and for local catalogue keys.
pub const MAX_ISBN_LENGTH: usize = 32;

/// Maximum length of a book title.
pub const MAX_TITLE_LENGTH: usize = 255;

/// Maximum length of an author string.
pub const MAX_AUTHOR_LENGTH: usize = 255;

// ============================================================================
// Profile Defaults
// ============================================================================

/// Major assigned to a freshly registered student.
pub const DEFAULT_STUDENT_MAJOR: &str = "Undeclared";

/// Study year assigned to a freshly registered student.
pub const DEFAULT_STUDENT_YEAR: u8 = 1;

/// Department assigned to a freshly registered faculty member.
pub const DEFAULT_FACULTY_DEPARTMENT: &str = "Unassigned";

/// Position assigned to a freshly registered faculty member.
pub const DEFAULT_FACULTY_POSITION: &str = "Lecturer";
