#![allow(async_fn_in_trait)]

use crate::error::StorageResult;
use crate::models::{Loan, LoanStatus, LoanView};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

/// Repository trait for the loan ledger
///
/// Listing queries return [`LoanView`] rows enriched with the borrower's
/// name and the book title through LEFT JOINs, newest loan first.
pub trait LoanRepository: Send + Sync {
    /// Find a loan by id
    async fn find_by_id(&self, id: i64) -> StorageResult<Option<Loan>>;

    /// Every loan, newest first
    async fn find_all_detailed(&self) -> StorageResult<Vec<LoanView>>;

    /// Loans of one user, newest first
    async fn find_by_user_detailed(&self, user_id: &str) -> StorageResult<Vec<LoanView>>;

    /// Count loans in a given status
    async fn count_by_status(&self, status: LoanStatus) -> StorageResult<i64>;

    /// Bulk-flip past-due `Active` loans to `Overdue`, returning the count changed
    async fn mark_overdue(&self, now: DateTime<Utc>) -> StorageResult<u64>;
}

/// SQLite implementation of LoanRepository
pub struct SqliteLoanRepository {
    pool: SqlitePool,
}

impl SqliteLoanRepository {
    /// Create a new SQLite loan repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl LoanRepository for SqliteLoanRepository {
    async fn find_by_id(&self, id: i64) -> StorageResult<Option<Loan>> {
        let mut conn = self.pool.acquire().await?;
        crate::transaction::find_loan(&mut conn, id).await
    }

    async fn find_all_detailed(&self) -> StorageResult<Vec<LoanView>> {
        let loans = sqlx::query_as::<_, LoanView>(
            r#"
            SELECT l.id, l.user_id, l.book_isbn, l.borrow_date, l.due_date,
                   l.return_date, l.status,
                   u.name AS user_name, b.title AS book_title
            FROM loans l
            LEFT JOIN users u ON u.id = l.user_id
            LEFT JOIN books b ON b.isbn = l.book_isbn
            ORDER BY l.id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(loans)
    }

    async fn find_by_user_detailed(&self, user_id: &str) -> StorageResult<Vec<LoanView>> {
        let loans = sqlx::query_as::<_, LoanView>(
            r#"
            SELECT l.id, l.user_id, l.book_isbn, l.borrow_date, l.due_date,
                   l.return_date, l.status,
                   u.name AS user_name, b.title AS book_title
            FROM loans l
            LEFT JOIN users u ON u.id = l.user_id
            LEFT JOIN books b ON b.isbn = l.book_isbn
            WHERE l.user_id = ?
            ORDER BY l.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(loans)
    }

    async fn count_by_status(&self, status: LoanStatus) -> StorageResult<i64> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM loans WHERE status = ?")
            .bind(status)
            .fetch_one(&self.pool)
            .await?;

        Ok(result.0)
    }

    async fn mark_overdue(&self, now: DateTime<Utc>) -> StorageResult<u64> {
        let mut conn = self.pool.acquire().await?;
        crate::transaction::mark_overdue(&mut conn, now).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Database;
    use crate::models::{Book, UserRecord};
    use crate::transaction;
    use chrono::Duration;
    use shelfkeep_core::{Role, UserFactory};

    async fn setup_test_db() -> Database {
        let db = Database::in_memory().await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        let user = UserFactory::create_for_role(Role::Student, "STU100", "Ann", "ann@x.edu", "s:d");
        transaction::insert_user(&mut conn, &UserRecord::from_user(&user))
            .await
            .unwrap();
        transaction::create_book(&mut conn, &Book::new("ISBN-1", "Dune", "Frank Herbert", 2))
            .await
            .unwrap();

        drop(conn);
        db
    }

    async fn create_test_loan(db: &Database, isbn: &str, due_in_days: i64) -> i64 {
        let mut conn = db.pool().acquire().await.unwrap();
        let now = Utc::now();
        transaction::create_loan(
            &mut conn,
            "STU100",
            isbn,
            now - Duration::days(14 - due_in_days),
            now + Duration::days(due_in_days),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_find_by_id() {
        let db = setup_test_db().await;
        let repo = SqliteLoanRepository::new(db.pool().clone());

        let id = create_test_loan(&db, "ISBN-1", 14).await;

        let loan = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(loan.user_id, "STU100");
        assert_eq!(loan.status, LoanStatus::Active);
        assert!(repo.find_by_id(id + 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_detailed_listing_is_enriched_newest_first() {
        let db = setup_test_db().await;
        let repo = SqliteLoanRepository::new(db.pool().clone());

        let first = create_test_loan(&db, "ISBN-1", 14).await;
        let second = create_test_loan(&db, "ISBN-gone", 14).await;

        let loans = repo.find_all_detailed().await.unwrap();
        assert_eq!(loans.len(), 2);
        assert_eq!(loans[0].loan.id, second);
        assert_eq!(loans[1].loan.id, first);

        assert_eq!(loans[1].user_name.as_deref(), Some("Ann"));
        assert_eq!(loans[1].book_title.as_deref(), Some("Dune"));
        // No matching book row
        assert!(loans[0].book_title.is_none());
    }

    #[tokio::test]
    async fn test_find_by_user_detailed() {
        let db = setup_test_db().await;
        let repo = SqliteLoanRepository::new(db.pool().clone());

        create_test_loan(&db, "ISBN-1", 14).await;

        assert_eq!(repo.find_by_user_detailed("STU100").await.unwrap().len(), 1);
        assert!(repo.find_by_user_detailed("STU999").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mark_overdue_and_count() {
        let db = setup_test_db().await;
        let repo = SqliteLoanRepository::new(db.pool().clone());

        create_test_loan(&db, "ISBN-1", -3).await;
        create_test_loan(&db, "ISBN-1", 5).await;

        assert_eq!(repo.mark_overdue(Utc::now()).await.unwrap(), 1);
        assert_eq!(repo.mark_overdue(Utc::now()).await.unwrap(), 0);

        assert_eq!(repo.count_by_status(LoanStatus::Overdue).await.unwrap(), 1);
        assert_eq!(repo.count_by_status(LoanStatus::Active).await.unwrap(), 1);
        assert_eq!(repo.count_by_status(LoanStatus::Completed).await.unwrap(), 0);
    }
}
