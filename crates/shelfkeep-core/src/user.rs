//! Role-typed user aggregate and the factory that builds it.
//!
//! A [`User`] carries the identity fields shared by every account plus a
//! [`Profile`] holding the role-specific payload. Capabilities such as the
//! borrow limit are resolved with a single match on the profile.
//!
//! # Examples
//!
//! ```
//! use shelfkeep_core::{Role, UserFactory};
//!
//! let user = UserFactory::create("head librarian", "LIB100", "Admin", "admin@library.com", "")
//!     .expect("known role");
//!
//! assert_eq!(user.role(), Role::HeadLibrarian);
//! assert_eq!(user.user_type(), "Head Librarian");
//! assert_eq!(user.max_books_allowed(), 10);
//! ```

use crate::{
    Result,
    constants::{
        DEFAULT_FACULTY_DEPARTMENT, DEFAULT_FACULTY_POSITION, DEFAULT_STUDENT_MAJOR,
        DEFAULT_STUDENT_YEAR,
    },
    error::Error,
    types::Role,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub major: String,
    pub year: u8,
    /// Outstanding fine balance in cents.
    pub fines_cents: i64,
}

impl Default for StudentProfile {
    fn default() -> Self {
        Self {
            major: DEFAULT_STUDENT_MAJOR.to_string(),
            year: DEFAULT_STUDENT_YEAR,
            fines_cents: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacultyProfile {
    pub department: String,
    pub position: String,
}

impl Default for FacultyProfile {
    fn default() -> Self {
        Self {
            department: DEFAULT_FACULTY_DEPARTMENT.to_string(),
            position: DEFAULT_FACULTY_POSITION.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibrarianProfile {
    pub hire_date: DateTime<Utc>,
    pub head_librarian: bool,
}

/// Role-specific payload of a [`User`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Profile {
    Student(StudentProfile),
    Faculty(FacultyProfile),
    /// Librarian or head librarian, distinguished by `head_librarian`.
    Librarian(LibrarianProfile),
}

/// A registered account with its role-specific profile.
///
/// The credential hash is skipped during serialization so a `User` can be
/// handed to presentation code as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub credential_hash: String,
    pub profile: Profile,
}

impl User {
    /// Role derived from the profile variant.
    #[must_use]
    pub fn role(&self) -> Role {
        match &self.profile {
            Profile::Student(_) => Role::Student,
            Profile::Faculty(_) => Role::Faculty,
            Profile::Librarian(p) if p.head_librarian => Role::HeadLibrarian,
            Profile::Librarian(_) => Role::Librarian,
        }
    }

    /// Stored role string (`"Student"`, `"Head Librarian"`, ...).
    #[must_use]
    pub fn user_type(&self) -> &'static str {
        self.role().as_str()
    }

    #[must_use]
    pub fn max_books_allowed(&self) -> u32 {
        self.role().max_books_allowed()
    }

    /// Returns `true` if another loan fits under the borrow limit.
    #[must_use]
    pub fn can_borrow_more(&self, open_loans: u32) -> bool {
        open_loans < self.max_books_allowed()
    }

    #[must_use]
    pub fn is_staff(&self) -> bool {
        self.role().is_staff()
    }

    /// Outstanding fines in cents; zero for non-students.
    #[must_use]
    pub fn fines_cents(&self) -> i64 {
        match &self.profile {
            Profile::Student(p) => p.fines_cents,
            _ => 0,
        }
    }

    fn student_mut(&mut self) -> Result<&mut StudentProfile> {
        let actual = self.user_type();
        match &mut self.profile {
            Profile::Student(p) => Ok(p),
            _ => Err(Error::WrongRole {
                expected: Role::Student.as_str(),
                actual,
            }),
        }
    }

    /// Add a fine to a student's balance.
    ///
    /// # Errors
    /// Returns `Error::WrongRole` for non-students,
    /// `Error::NonPositiveAmount` unless `cents > 0` and
    /// `Error::InvalidField` if the balance would overflow.
    pub fn add_fine(&mut self, cents: i64) -> Result<()> {
        let profile = self.student_mut()?;
        if cents <= 0 {
            return Err(Error::NonPositiveAmount(cents));
        }
        profile.fines_cents = profile
            .fines_cents
            .checked_add(cents)
            .ok_or_else(|| Error::invalid("fine", "balance overflow"))?;
        Ok(())
    }

    /// Pay down a student's fine balance.
    ///
    /// # Errors
    /// Returns `Error::WrongRole` for non-students, `Error::NonPositiveAmount`
    /// unless `cents > 0` and `Error::PaymentExceedsFines` if the payment is
    /// larger than the outstanding balance.
    pub fn pay_fine(&mut self, cents: i64) -> Result<()> {
        let profile = self.student_mut()?;
        if cents <= 0 {
            return Err(Error::NonPositiveAmount(cents));
        }
        if cents > profile.fines_cents {
            return Err(Error::PaymentExceedsFines {
                payment: cents,
                balance: profile.fines_cents,
            });
        }
        profile.fines_cents -= cents;
        Ok(())
    }

    /// Whole years since the hire date, for librarians.
    #[must_use]
    pub fn years_of_service(&self, now: DateTime<Utc>) -> Option<i64> {
        match &self.profile {
            Profile::Librarian(p) => Some((now - p.hire_date).num_days() * 4 / 1461),
            _ => None,
        }
    }
}

/// Builds role-typed [`User`] values from raw role and identity data.
///
/// Never persists anything. [`UserFactory::create_at`] is fully
/// deterministic; `create` and `create_for_role` read the system clock for a
/// librarian's hire date and are otherwise identical.
pub struct UserFactory;

impl UserFactory {
    /// Build a user for `role`, matched case-insensitively.
    ///
    /// Returns `None` for an unrecognized role; this signals a data or
    /// configuration problem to the caller rather than a fatal fault.
    pub fn create(
        role: &str,
        id: &str,
        name: &str,
        email: &str,
        credential_hash: &str,
    ) -> Option<User> {
        match role.parse::<Role>() {
            Ok(role) => Some(Self::create_for_role(role, id, name, email, credential_hash)),
            Err(_) => {
                warn!(role, user_id = id, "Unrecognized user role");
                None
            }
        }
    }

    /// Build a user for an already parsed role, hired now if a librarian.
    pub fn create_for_role(
        role: Role,
        id: &str,
        name: &str,
        email: &str,
        credential_hash: &str,
    ) -> User {
        Self::create_at(role, id, name, email, credential_hash, Utc::now())
    }

    /// Build a user for `role` with `hired` as a librarian's hire date.
    ///
    /// The same inputs always produce the same user.
    pub fn create_at(
        role: Role,
        id: &str,
        name: &str,
        email: &str,
        credential_hash: &str,
        hired: DateTime<Utc>,
    ) -> User {
        let profile = match role {
            Role::Student => Profile::Student(StudentProfile::default()),
            Role::Faculty => Profile::Faculty(FacultyProfile::default()),
            Role::Librarian | Role::HeadLibrarian => Profile::Librarian(LibrarianProfile {
                hire_date: hired,
                head_librarian: role == Role::HeadLibrarian,
            }),
        };

        User {
            id: id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            credential_hash: credential_hash.to_string(),
            profile,
        }
    }
}
