use shelfkeep_storage::StorageError;
use thiserror::Error;

/// Outcome of a rejected or failed lending operation.
///
/// Business-rule rejections (unknown keys, stock, limits, already completed
/// loans) are checked before anything is written. Persistence faults are
/// wrapped in [`LendingError::Storage`], whose message deliberately carries no
/// database detail; the detail is logged instead.
#[derive(Debug, Error)]
pub enum LendingError {
    // Input errors
    #[error("{0}")]
    InvalidInput(#[from] shelfkeep_core::Error),

    #[error("Unknown role: {0}")]
    InvalidRole(String),

    #[error("Email already registered: {0}")]
    EmailTaken(String),

    // Session errors
    #[error("Invalid email or password")]
    AuthFailed,

    #[error("No user is logged in")]
    NotAuthenticated,

    // Lookup errors
    #[error("User not found: {0}")]
    UnknownUser(String),

    #[error("Book not found: {0}")]
    UnknownBook(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(i64),

    // Business rules
    #[error("A book with ISBN {0} already exists")]
    DuplicateIsbn(String),

    #[error("No copies of {0} are available")]
    OutOfStock(String),

    #[error("User {user_id} already has {isbn} on loan")]
    AlreadyBorrowed { user_id: String, isbn: String },

    #[error("User {user_id} has reached the borrowing limit of {limit} books")]
    BorrowLimitReached { user_id: String, limit: u32 },

    #[error("Cannot set total copies to {requested}: {borrowed} copies are on loan")]
    BelowBorrowedCount { requested: u32, borrowed: i64 },

    #[error("Cannot delete {isbn}: {open} open loans reference it")]
    HasActiveLoans { isbn: String, open: i64 },

    #[error("Transaction {0} is already completed")]
    AlreadyCompleted(i64),

    // Faults
    #[error("Invalid lending configuration: {0}")]
    Configuration(String),

    #[error("Inconsistent library state: {0}")]
    Inconsistent(String),

    #[error("storage operation failed")]
    Storage(#[from] StorageError),
}

impl From<sqlx::Error> for LendingError {
    fn from(err: sqlx::Error) -> Self {
        LendingError::Storage(StorageError::Database(err))
    }
}

impl LendingError {
    /// Returns `true` for faults (storage, configuration, inconsistent data)
    /// as opposed to ordinary business-rule rejections.
    pub fn is_fault(&self) -> bool {
        matches!(
            self,
            LendingError::Storage(_) | LendingError::Inconsistent(_) | LendingError::Configuration(_)
        )
    }
}

pub type LendingResult<T> = Result<T, LendingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_hides_detail() {
        let err = LendingError::from(StorageError::Configuration("disk on fire".to_string()));
        assert_eq!(err.to_string(), "storage operation failed");
        assert!(err.is_fault());
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_rule_rejections_are_not_faults() {
        assert!(!LendingError::OutOfStock("ISBN-1".to_string()).is_fault());
        assert!(!LendingError::AlreadyCompleted(3).is_fault());
        assert!(!LendingError::AuthFailed.is_fault());
    }

    #[test]
    fn test_core_error_passes_through() {
        let err = LendingError::from(shelfkeep_core::Error::invalid("title", "must not be empty"));
        assert_eq!(err.to_string(), "Invalid title: must not be empty");
    }
}
