use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a loan
///
/// Stored as text in the `loans.status` column.
///
/// # Transitions
///
/// - `Active` → `Overdue` (overdue sweep, once the due date has passed)
/// - `Active` | `Overdue` → `Completed` (return, exactly once)
///
/// A completed loan is never revived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
pub enum LoanStatus {
    Active,
    Completed,
    Overdue,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Completed => "Completed",
            Self::Overdue => "Overdue",
        }
    }

    /// Returns `true` while the copy is still out (Active or Overdue).
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Active | Self::Overdue)
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One copy of a book lent to one user
///
/// # Fields
///
/// * `id` - Store-assigned, monotonically increasing key
/// * `user_id` - Borrowing account
/// * `book_isbn` - Borrowed title; may dangle once the book is deleted
/// * `borrow_date` - When the copy left the shelf
/// * `due_date` - `borrow_date` plus the loan period
/// * `return_date` - Set if and only if `status` is `Completed`
/// * `status` - Lifecycle state
///
/// # Examples
///
/// ```
/// use chrono::{Duration, Utc};
/// use shelfkeep_storage::models::{Loan, LoanStatus};
///
/// let now = Utc::now();
/// let loan = Loan {
///     id: 1,
///     user_id: "STU100".to_string(),
///     book_isbn: "ISBN-1".to_string(),
///     borrow_date: now - Duration::days(20),
///     due_date: now - Duration::days(6),
///     return_date: None,
///     status: LoanStatus::Active,
/// };
///
/// assert!(loan.is_open());
/// assert!(loan.is_past_due(now));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Loan {
    pub id: i64,
    pub user_id: String,
    pub book_isbn: String,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub status: LoanStatus,
}

impl Loan {
    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    /// Returns `true` if the loan is still open and its due date has passed.
    pub fn is_past_due(&self, now: DateTime<Utc>) -> bool {
        self.is_open() && self.due_date < now
    }
}

/// Loan enriched with the borrower's name and the book title for listings
///
/// Both enrichment columns come from LEFT JOINs and are `None` when the
/// referenced row no longer exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct LoanView {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub loan: Loan,
    pub user_name: Option<String>,
    pub book_title: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn loan(status: LoanStatus, due_in_days: i64) -> Loan {
        let now = Utc::now();
        Loan {
            id: 7,
            user_id: "STU100".to_string(),
            book_isbn: "ISBN-1".to_string(),
            borrow_date: now - Duration::days(14 - due_in_days),
            due_date: now + Duration::days(due_in_days),
            return_date: (status == LoanStatus::Completed).then_some(now),
            status,
        }
    }

    #[test]
    fn test_status_is_open() {
        assert!(LoanStatus::Active.is_open());
        assert!(LoanStatus::Overdue.is_open());
        assert!(!LoanStatus::Completed.is_open());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(LoanStatus::Active.to_string(), "Active");
        assert_eq!(LoanStatus::Completed.to_string(), "Completed");
        assert_eq!(LoanStatus::Overdue.to_string(), "Overdue");
    }

    #[test]
    fn test_past_due() {
        let now = Utc::now();
        assert!(loan(LoanStatus::Active, -1).is_past_due(now));
        assert!(!loan(LoanStatus::Active, 3).is_past_due(now));
        assert!(!loan(LoanStatus::Completed, -1).is_past_due(now));
    }
}
