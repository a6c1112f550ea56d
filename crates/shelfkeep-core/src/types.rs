use crate::{
    Result,
    constants::{
        FACULTY_ID_PREFIX, FACULTY_MAX_BOOKS, LIBRARIAN_ID_PREFIX, LIBRARIAN_MAX_BOOKS,
        STUDENT_ID_PREFIX, STUDENT_MAX_BOOKS,
    },
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Account role, chosen at registration and immutable afterwards.
///
/// The role decides the borrow limit and the prefix of the generated user id.
/// Its stored form is the human-readable name returned by [`Role::as_str`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Student,
    Faculty,
    Librarian,
    HeadLibrarian,
}

impl Role {
    /// Every role, in registration-form order.
    pub const ALL: [Role; 4] = [
        Role::Student,
        Role::Faculty,
        Role::Librarian,
        Role::HeadLibrarian,
    ];

    /// Stored role string, as written to the `users.user_type` column.
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "Student",
            Role::Faculty => "Faculty",
            Role::Librarian => "Librarian",
            Role::HeadLibrarian => "Head Librarian",
        }
    }

    /// Prefix used when allocating user ids for this role.
    ///
    /// Librarians and the head librarian share the `LIB` prefix.
    #[inline]
    #[must_use]
    pub fn id_prefix(self) -> &'static str {
        match self {
            Role::Student => STUDENT_ID_PREFIX,
            Role::Faculty => FACULTY_ID_PREFIX,
            Role::Librarian | Role::HeadLibrarian => LIBRARIAN_ID_PREFIX,
        }
    }

    /// Maximum number of simultaneously open loans for this role.
    #[inline]
    #[must_use]
    pub fn max_books_allowed(self) -> u32 {
        match self {
            Role::Student => STUDENT_MAX_BOOKS,
            Role::Faculty => FACULTY_MAX_BOOKS,
            Role::Librarian | Role::HeadLibrarian => LIBRARIAN_MAX_BOOKS,
        }
    }

    /// Returns `true` for library staff (librarian or head librarian).
    #[inline]
    #[must_use]
    pub fn is_staff(self) -> bool {
        matches!(self, Role::Librarian | Role::HeadLibrarian)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = Error;

    /// Parse a role name case-insensitively.
    ///
    /// Accepts `student`, `faculty`, `librarian` and `head librarian`
    /// in any letter case, surrounded by optional whitespace.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "faculty" => Ok(Role::Faculty),
            "librarian" => Ok(Role::Librarian),
            "head librarian" => Ok(Role::HeadLibrarian),
            _ => Err(Error::UnknownRole(s.to_string())),
        }
    }
}
