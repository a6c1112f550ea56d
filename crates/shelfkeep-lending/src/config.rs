use crate::error::{LendingError, LendingResult};
use chrono::Duration;
use shelfkeep_core::constants::LOAN_PERIOD_DAYS;

/// Lending policy configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LendingConfig {
    /// Days between borrow and due date
    pub loan_period_days: i64,

    /// Whether to refuse loans once a user holds `max_books_allowed` open loans
    pub enforce_borrow_limit: bool,

    /// Buffered change signals per subscriber
    pub notify_capacity: usize,
}

impl Default for LendingConfig {
    fn default() -> Self {
        Self {
            loan_period_days: LOAN_PERIOD_DAYS,
            enforce_borrow_limit: true,
            notify_capacity: 16,
        }
    }
}

impl LendingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the loan period in days
    pub fn loan_period_days(mut self, days: i64) -> Self {
        self.loan_period_days = days;
        self
    }

    /// Set whether the per-role borrow limit is enforced
    pub fn enforce_borrow_limit(mut self, enforce: bool) -> Self {
        self.enforce_borrow_limit = enforce;
        self
    }

    /// Set the change notification buffer size
    pub fn notify_capacity(mut self, capacity: usize) -> Self {
        self.notify_capacity = capacity;
        self
    }

    pub fn loan_period(&self) -> Duration {
        Duration::days(self.loan_period_days)
    }

    pub fn validate(&self) -> LendingResult<()> {
        if !(1..=3650).contains(&self.loan_period_days) {
            return Err(LendingError::Configuration(format!(
                "loan period must be between 1 and 3650 days, got {}",
                self.loan_period_days
            )));
        }
        Ok(())
    }
}
