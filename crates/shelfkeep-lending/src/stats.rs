use serde::{Deserialize, Serialize};

/// Library-wide counters shown on the dashboard.
///
/// `active_loans` counts loans still within their due date; loans past due
/// are counted in `overdue_loans` once the sweep has flipped them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryStatistics {
    pub total_books: i64,
    pub total_users: i64,
    pub active_loans: i64,
    pub overdue_loans: i64,
}

impl LibraryStatistics {
    /// Loans not yet returned.
    pub fn open_loans(&self) -> i64 {
        self.active_loans + self.overdue_loans
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_with_snake_case_keys() {
        let stats = LibraryStatistics {
            total_books: 3,
            total_users: 2,
            active_loans: 1,
            overdue_loans: 4,
        };
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["total_books"], 3);
        assert_eq!(json["overdue_loans"], 4);
        assert_eq!(stats.open_loans(), 5);
    }
}
