use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // Input validation errors
    #[error("Invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Unknown role: {0}")]
    UnknownRole(String),

    // Profile errors
    #[error("Operation requires a {expected} account, got {actual}")]
    WrongRole {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Amount must be positive, got {0}")]
    NonPositiveAmount(i64),

    #[error("Payment of {payment} exceeds outstanding fines of {balance}")]
    PaymentExceedsFines { payment: i64, balance: i64 },
}

impl Error {
    /// Build an [`Error::InvalidField`] for the given field.
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
