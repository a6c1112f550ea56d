//! Connection-level operations for atomic multistep lending operations.
//!
//! Every function here takes a bare `&mut SqliteConnection`, so the same call
//! works on a pooled connection or inside an open transaction (`&mut tx`
//! derefs to the connection). The lending engine groups these calls so that
//! a copy-count change and its ledger write commit or roll back together.
//!
//! # When to Use Transactions
//!
//! - **Borrow**: check the user, decrement `available_copies`, append a loan
//! - **Return**: complete the loan, increment `available_copies`
//! - **Register**: allocate the next role-prefixed id and insert the account
//! - **Catalogue edits**: re-check open loans before resizing or deleting a book
//!
//! # Usage Pattern
//!
//! ```no_run
//! use chrono::{Duration, Utc};
//! use shelfkeep_storage::{Database, DatabaseConfig, transaction};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::new(DatabaseConfig::new("shelfkeep.db")).await?;
//!
//! let mut tx = db.pool().begin().await?;
//!
//! let now = Utc::now();
//! if transaction::decrement_available(&mut tx, "978-0441013593").await? {
//!     transaction::create_loan(&mut tx, "STU100", "978-0441013593", now, now + Duration::days(14))
//!         .await?;
//! }
//!
//! // Both writes succeed or neither does
//! tx.commit().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Atomic Guarantees
//!
//! The copy-count updates are guarded in SQL (`available_copies > 0`,
//! `available_copies < total_copies`, `status != 'Completed'`) and report
//! whether a row changed. A `false` return means the precondition no longer
//! holds and the caller should drop the transaction.

use crate::error::StorageResult;
use crate::models::{Book, Loan, UserRecord};
use chrono::{DateTime, Utc};
use shelfkeep_core::constants::USER_ID_FIRST_SEQUENCE;
use sqlx::SqliteConnection;

// ============================================================================
// Users
// ============================================================================

/// Next free numeric suffix for a role prefix (`STU`, `FAC`, `LIB`).
///
/// Sequences start at [`USER_ID_FIRST_SEQUENCE`] and only grow, so an id is
/// never handed out twice for the same prefix.
pub async fn next_user_sequence(conn: &mut SqliteConnection, prefix: &str) -> StorageResult<i64> {
    let max: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT MAX(CAST(SUBSTR(id, ?) AS INTEGER))
        FROM users
        WHERE SUBSTR(id, 1, ?) = ?
        "#,
    )
    .bind(prefix.len() as i64 + 1)
    .bind(prefix.len() as i64)
    .bind(prefix)
    .fetch_one(&mut *conn)
    .await?;

    Ok(max
        .map(|m| m + 1)
        .unwrap_or(USER_ID_FIRST_SEQUENCE)
        .max(USER_ID_FIRST_SEQUENCE))
}

/// Insert a new account row
///
/// # Errors
///
/// Returns error if:
/// - Unique constraint violation (duplicate id or email)
/// - A CHECK constraint rejects the row (name length, unknown role string)
pub async fn insert_user(conn: &mut SqliteConnection, user: &UserRecord) -> StorageResult<()> {
    sqlx::query(
        r#"
        INSERT INTO users (
            id, name, email, credential_hash, user_type,
            major, year_of_study, fines_cents,
            department, position, hire_date, created_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.id)
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.credential_hash)
    .bind(&user.user_type)
    .bind(&user.major)
    .bind(user.year_of_study)
    .bind(user.fines_cents)
    .bind(&user.department)
    .bind(&user.position)
    .bind(user.hire_date)
    .bind(user.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn find_user(conn: &mut SqliteConnection, id: &str) -> StorageResult<Option<UserRecord>> {
    let user = sqlx::query_as::<_, UserRecord>(
        r#"
        SELECT id, name, email, credential_hash, user_type,
               major, year_of_study, fines_cents,
               department, position, hire_date, created_at
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(user)
}

/// Returns `true` if the (already normalized) email is registered.
pub async fn email_taken(conn: &mut SqliteConnection, email: &str) -> StorageResult<bool> {
    let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = ?")
        .bind(email)
        .fetch_one(&mut *conn)
        .await?;

    Ok(result.0 > 0)
}

// ============================================================================
// Books
// ============================================================================

pub async fn find_book(conn: &mut SqliteConnection, isbn: &str) -> StorageResult<Option<Book>> {
    let book = sqlx::query_as::<_, Book>(
        r#"
        SELECT isbn, title, author, total_copies, available_copies
        FROM books
        WHERE isbn = ?
        "#,
    )
    .bind(isbn)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(book)
}

/// Insert a catalogue entry
///
/// # Errors
///
/// Returns a unique violation if the ISBN already exists.
pub async fn create_book(conn: &mut SqliteConnection, book: &Book) -> StorageResult<()> {
    sqlx::query(
        r#"
        INSERT INTO books (isbn, title, author, total_copies, available_copies)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&book.isbn)
    .bind(&book.title)
    .bind(&book.author)
    .bind(book.total_copies)
    .bind(book.available_copies)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Overwrite title, author and both copy counts of an existing book.
///
/// Returns `false` if no book has that ISBN.
pub async fn update_book(conn: &mut SqliteConnection, book: &Book) -> StorageResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE books
        SET title = ?, author = ?, total_copies = ?, available_copies = ?
        WHERE isbn = ?
        "#,
    )
    .bind(&book.title)
    .bind(&book.author)
    .bind(book.total_copies)
    .bind(book.available_copies)
    .bind(&book.isbn)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Returns `false` if no book has that ISBN.
pub async fn delete_book(conn: &mut SqliteConnection, isbn: &str) -> StorageResult<bool> {
    let result = sqlx::query("DELETE FROM books WHERE isbn = ?")
        .bind(isbn)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Take one copy off the shelf.
///
/// Returns `false` (and changes nothing) if the book is missing or has no
/// copy available.
pub async fn decrement_available(conn: &mut SqliteConnection, isbn: &str) -> StorageResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE books
        SET available_copies = available_copies - 1
        WHERE isbn = ? AND available_copies > 0
        "#,
    )
    .bind(isbn)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Put one copy back on the shelf.
///
/// Returns `false` if the book is missing or every copy is already shelved.
pub async fn increment_available(conn: &mut SqliteConnection, isbn: &str) -> StorageResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE books
        SET available_copies = available_copies + 1
        WHERE isbn = ? AND available_copies < total_copies
        "#,
    )
    .bind(isbn)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

// ============================================================================
// Loans
// ============================================================================

/// Append an `Active` loan to the ledger
///
/// # Returns
///
/// The store-assigned loan id. Ids are AUTOINCREMENT and never reused.
pub async fn create_loan(
    conn: &mut SqliteConnection,
    user_id: &str,
    book_isbn: &str,
    borrow_date: DateTime<Utc>,
    due_date: DateTime<Utc>,
) -> StorageResult<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO loans (user_id, book_isbn, borrow_date, due_date, status)
        VALUES (?, ?, ?, ?, 'Active')
        "#,
    )
    .bind(user_id)
    .bind(book_isbn)
    .bind(borrow_date)
    .bind(due_date)
    .execute(&mut *conn)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn find_loan(conn: &mut SqliteConnection, id: i64) -> StorageResult<Option<Loan>> {
    let loan = sqlx::query_as::<_, Loan>(
        r#"
        SELECT id, user_id, book_isbn, borrow_date, due_date, return_date, status
        FROM loans
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(loan)
}

/// Mark an open loan `Completed` with its return date.
///
/// Returns `false` if the loan is missing or already completed.
pub async fn complete_loan(
    conn: &mut SqliteConnection,
    id: i64,
    returned_at: DateTime<Utc>,
) -> StorageResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE loans
        SET status = 'Completed', return_date = ?
        WHERE id = ? AND status != 'Completed'
        "#,
    )
    .bind(returned_at)
    .bind(id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Flip every `Active` loan whose due date is before `now` to `Overdue`.
///
/// Returns the number of loans changed; a second call with the same `now`
/// returns 0.
pub async fn mark_overdue(conn: &mut SqliteConnection, now: DateTime<Utc>) -> StorageResult<u64> {
    let result = sqlx::query(
        r#"
        UPDATE loans
        SET status = 'Overdue'
        WHERE status = 'Active' AND due_date < ?
        "#,
    )
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

/// Open (Active or Overdue) loans held by a user.
pub async fn count_open_loans_for_user(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> StorageResult<i64> {
    let result: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM loans WHERE user_id = ? AND status IN ('Active', 'Overdue')",
    )
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(result.0)
}

/// Returns `true` if the user already holds an open loan of this ISBN.
pub async fn has_open_loan(
    conn: &mut SqliteConnection,
    user_id: &str,
    book_isbn: &str,
) -> StorageResult<bool> {
    let result: (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM loans
        WHERE user_id = ? AND book_isbn = ? AND status IN ('Active', 'Overdue')
        "#,
    )
    .bind(user_id)
    .bind(book_isbn)
    .fetch_one(&mut *conn)
    .await?;

    Ok(result.0 > 0)
}

/// Open loans referencing an ISBN, across all users.
pub async fn count_open_loans_for_book(
    conn: &mut SqliteConnection,
    book_isbn: &str,
) -> StorageResult<i64> {
    let result: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM loans WHERE book_isbn = ? AND status IN ('Active', 'Overdue')",
    )
    .bind(book_isbn)
    .fetch_one(&mut *conn)
    .await?;

    Ok(result.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Database;
    use crate::models::LoanStatus;
    use chrono::Duration;
    use shelfkeep_core::{Role, UserFactory};

    async fn setup_test_db() -> Database {
        Database::in_memory().await.unwrap()
    }

    fn student(id: &str, email: &str) -> UserRecord {
        let user = UserFactory::create_for_role(Role::Student, id, "Tx Student", email, "s:d");
        UserRecord::from_user(&user)
    }

    #[tokio::test]
    async fn test_next_user_sequence_starts_at_first() {
        let db = setup_test_db().await;
        let mut conn = db.pool().acquire().await.unwrap();

        assert_eq!(
            next_user_sequence(&mut conn, "STU").await.unwrap(),
            USER_ID_FIRST_SEQUENCE
        );
    }

    #[tokio::test]
    async fn test_next_user_sequence_per_prefix() {
        let db = setup_test_db().await;
        let mut conn = db.pool().acquire().await.unwrap();

        insert_user(&mut conn, &student("STU100", "a@x.edu")).await.unwrap();
        insert_user(&mut conn, &student("STU107", "b@x.edu")).await.unwrap();

        assert_eq!(next_user_sequence(&mut conn, "STU").await.unwrap(), 108);
        assert_eq!(next_user_sequence(&mut conn, "FAC").await.unwrap(), 100);
    }

    #[tokio::test]
    async fn test_transaction_commit() {
        let db = setup_test_db().await;
        let mut tx = db.pool().begin().await.unwrap();

        insert_user(&mut tx, &student("STU100", "a@x.edu")).await.unwrap();
        create_book(&mut tx, &Book::new("ISBN-1", "Dune", "Frank Herbert", 1))
            .await
            .unwrap();

        tx.commit().await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        assert!(find_user(&mut conn, "STU100").await.unwrap().is_some());
        assert!(find_book(&mut conn, "ISBN-1").await.unwrap().is_some());
        assert!(email_taken(&mut conn, "a@x.edu").await.unwrap());
    }

    #[tokio::test]
    async fn test_transaction_rollback() {
        let db = setup_test_db().await;
        let mut tx = db.pool().begin().await.unwrap();

        create_book(&mut tx, &Book::new("ISBN-1", "Dune", "Frank Herbert", 1))
            .await
            .unwrap();

        // Explicitly rollback
        tx.rollback().await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        assert!(find_book(&mut conn, "ISBN-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_guarded_copy_counts() {
        let db = setup_test_db().await;
        let mut conn = db.pool().acquire().await.unwrap();

        create_book(&mut conn, &Book::new("ISBN-1", "Dune", "Frank Herbert", 1))
            .await
            .unwrap();

        // Already fully shelved
        assert!(!increment_available(&mut conn, "ISBN-1").await.unwrap());

        assert!(decrement_available(&mut conn, "ISBN-1").await.unwrap());
        assert!(!decrement_available(&mut conn, "ISBN-1").await.unwrap());
        assert!(!decrement_available(&mut conn, "ISBN-missing").await.unwrap());

        let book = find_book(&mut conn, "ISBN-1").await.unwrap().unwrap();
        assert_eq!(book.available_copies, 0);

        assert!(increment_available(&mut conn, "ISBN-1").await.unwrap());
        let book = find_book(&mut conn, "ISBN-1").await.unwrap().unwrap();
        assert_eq!(book.available_copies, 1);
    }

    #[tokio::test]
    async fn test_loan_lifecycle() {
        let db = setup_test_db().await;
        let mut conn = db.pool().acquire().await.unwrap();
        insert_user(&mut conn, &student("STU100", "a@x.edu")).await.unwrap();

        let now = Utc::now();
        let first = create_loan(&mut conn, "STU100", "ISBN-1", now, now + Duration::days(14))
            .await
            .unwrap();
        let second = create_loan(&mut conn, "STU100", "ISBN-2", now, now + Duration::days(14))
            .await
            .unwrap();
        assert!(second > first);

        assert_eq!(count_open_loans_for_user(&mut conn, "STU100").await.unwrap(), 2);
        assert!(has_open_loan(&mut conn, "STU100", "ISBN-1").await.unwrap());
        assert_eq!(count_open_loans_for_book(&mut conn, "ISBN-1").await.unwrap(), 1);

        assert!(complete_loan(&mut conn, first, now).await.unwrap());
        assert!(!complete_loan(&mut conn, first, now).await.unwrap());
        assert!(!complete_loan(&mut conn, 9999, now).await.unwrap());

        let loan = find_loan(&mut conn, first).await.unwrap().unwrap();
        assert_eq!(loan.status, LoanStatus::Completed);
        assert!(loan.return_date.is_some());
        assert!(!has_open_loan(&mut conn, "STU100", "ISBN-1").await.unwrap());
        assert_eq!(count_open_loans_for_user(&mut conn, "STU100").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_mark_overdue_is_idempotent() {
        let db = setup_test_db().await;
        let mut conn = db.pool().acquire().await.unwrap();
        insert_user(&mut conn, &student("STU100", "a@x.edu")).await.unwrap();

        let now = Utc::now();
        let late = create_loan(
            &mut conn,
            "STU100",
            "ISBN-1",
            now - Duration::days(20),
            now - Duration::days(6),
        )
        .await
        .unwrap();
        let on_time = create_loan(&mut conn, "STU100", "ISBN-2", now, now + Duration::days(14))
            .await
            .unwrap();

        assert_eq!(mark_overdue(&mut conn, now).await.unwrap(), 1);
        assert_eq!(mark_overdue(&mut conn, now).await.unwrap(), 0);

        let late = find_loan(&mut conn, late).await.unwrap().unwrap();
        let on_time = find_loan(&mut conn, on_time).await.unwrap().unwrap();
        assert_eq!(late.status, LoanStatus::Overdue);
        assert_eq!(on_time.status, LoanStatus::Active);

        // Overdue loans still count as open
        assert_eq!(count_open_loans_for_user(&mut conn, "STU100").await.unwrap(), 2);
    }
}
