//! Integration tests for database connection, pooling and transactions
//!
//! These tests use SQLite in-memory and temporary file databases and
//! validate migrations, pooled access and the atomicity of multi-statement
//! lending writes.
//!
//! Run with: cargo test --package shelfkeep-storage --test integration_database

use chrono::{Duration, Utc};
use shelfkeep_core::{Role, UserFactory};
use shelfkeep_storage::connection::{Database, DatabaseConfig};
use shelfkeep_storage::models::{Book, LoanStatus, UserRecord};
use shelfkeep_storage::repositories::{
    BookRepository, LoanRepository, SqliteBookRepository, SqliteLoanRepository,
    SqliteUserRepository, UserRepository,
};
use shelfkeep_storage::transaction;
use std::sync::Arc;
use tokio::sync::Barrier;

fn student(id: &str, email: &str) -> UserRecord {
    let user = UserFactory::create_for_role(Role::Student, id, "Integration", email, "s:d");
    UserRecord::from_user(&user)
}

#[tokio::test]
async fn test_in_memory_database() {
    let db = Database::in_memory().await.unwrap();
    db.health_check().await.unwrap();
    db.close().await;
}

#[tokio::test]
async fn test_concurrent_access() {
    let db = Database::in_memory().await.unwrap();

    const NUM_CONCURRENT_TASKS: usize = 10;
    let barrier = Arc::new(Barrier::new(NUM_CONCURRENT_TASKS));

    let mut handles = vec![];

    for i in 0..NUM_CONCURRENT_TASKS {
        let db_clone = db.clone();
        let barrier_clone = barrier.clone();

        let handle = tokio::spawn(async move {
            barrier_clone.wait().await;

            let result: Result<(i64,), sqlx::Error> = sqlx::query_as("SELECT ?")
                .bind(i as i64)
                .fetch_one(db_clone.pool())
                .await;

            result.unwrap()
        });

        handles.push(handle);
    }

    for (i, handle) in handles.into_iter().enumerate() {
        let value = handle.await.unwrap();
        assert_eq!(value.0, i as i64);
    }

    db.close().await;
}

#[tokio::test]
async fn test_migration_idempotency() {
    let db = Database::in_memory().await.unwrap();

    db.migrate().await.unwrap();

    db.migrate().await.unwrap();

    for table in ["users", "books", "loans"] {
        let result: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?")
                .bind(table)
                .fetch_one(db.pool())
                .await
                .unwrap();

        assert_eq!(result.0, 1, "missing table {table}");
    }

    db.close().await;
}

#[tokio::test]
async fn test_file_database_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("library.db");
    let path_str = path.to_string_lossy().into_owned();

    let db = Database::new(DatabaseConfig::new(path_str.clone())).await.unwrap();
    SqliteBookRepository::new(db.pool().clone())
        .create(&Book::new("ISBN-1", "Dune", "Frank Herbert", 3))
        .await
        .unwrap();
    db.close().await;

    assert!(path.exists());

    let reopened = Database::new(DatabaseConfig::new(path_str.clone())).await.unwrap();
    let book = SqliteBookRepository::new(reopened.pool().clone())
        .find_by_isbn("ISBN-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(book.total_copies, 3);
    reopened.close().await;
}

#[tokio::test]
async fn test_sequential_transactions() {
    let db = Database::in_memory().await.unwrap();

    let mut tx1 = db.pool().begin().await.unwrap();
    let seq = transaction::next_user_sequence(&mut tx1, "STU").await.unwrap();
    transaction::insert_user(&mut tx1, &student(&format!("STU{seq}"), "one@x.edu"))
        .await
        .unwrap();
    tx1.commit().await.unwrap();

    let mut tx2 = db.pool().begin().await.unwrap();
    let seq = transaction::next_user_sequence(&mut tx2, "STU").await.unwrap();
    transaction::insert_user(&mut tx2, &student(&format!("STU{seq}"), "two@x.edu"))
        .await
        .unwrap();
    tx2.commit().await.unwrap();

    let users = SqliteUserRepository::new(db.pool().clone());
    assert!(users.find_by_id("STU100").await.unwrap().is_some());
    assert!(users.find_by_id("STU101").await.unwrap().is_some());
    assert_eq!(users.count().await.unwrap(), 2);

    db.close().await;
}

#[tokio::test]
async fn test_failed_ledger_write_rolls_back_copy_count() {
    let db = Database::in_memory().await.unwrap();
    let books = SqliteBookRepository::new(db.pool().clone());
    books
        .create(&Book::new("ISBN-1", "Dune", "Frank Herbert", 1))
        .await
        .unwrap();

    let mut tx = db.pool().begin().await.unwrap();
    assert!(transaction::decrement_available(&mut tx, "ISBN-1").await.unwrap());

    // No such user: the foreign key rejects the loan row
    let now = Utc::now();
    let insert =
        transaction::create_loan(&mut tx, "STU404", "ISBN-1", now, now + Duration::days(14)).await;
    assert!(insert.is_err());
    drop(tx);

    let book = books.find_by_isbn("ISBN-1").await.unwrap().unwrap();
    assert_eq!(book.available_copies, 1);

    let loans = SqliteLoanRepository::new(db.pool().clone());
    assert_eq!(loans.count_by_status(LoanStatus::Active).await.unwrap(), 0);

    db.close().await;
}
