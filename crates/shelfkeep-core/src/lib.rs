//! Domain core for the shelfkeep lending tracker.
//!
//! Holds everything that needs no I/O: roles, the role-typed [`User`]
//! aggregate and its [`UserFactory`], salted credential hashing, input
//! validation and the shared policy constants.

pub mod constants;
pub mod credential;
pub mod error;
pub mod types;
pub mod user;
pub mod validation;

pub use error::{Error, Result};
pub use types::*;
pub use user::{FacultyProfile, LibrarianProfile, Profile, StudentProfile, User, UserFactory};

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
