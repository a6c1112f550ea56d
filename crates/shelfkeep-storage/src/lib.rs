//! Storage layer for the shelfkeep lending tracker.
//!
//! This crate provides SQLite-backed persistence for the three stores the
//! lending engine works against: accounts, the book catalogue and the loan
//! ledger.
//!
//! # Architecture
//!
//! The storage layer uses a repository pattern with the following components:
//!
//! - [`Database`] - Connection pool manager with automatic migrations
//! - [`UserRepository`], [`BookRepository`], [`LoanRepository`] - Data access traits
//! - [`transaction`] - Connection-level statements for atomic multistep operations
//!
//! # Core Concepts
//!
//! ## Guarded Copy Counts
//!
//! `books.available_copies` only moves through guarded UPDATE statements
//! (`available_copies > 0` to lend, `available_copies < total_copies` to
//! return) backed by a table CHECK constraint, so the count can never leave
//! `0..=total_copies` even if a caller skips its own checks.
//!
//! ## Loan Ledger
//!
//! Loan ids are AUTOINCREMENT and never reused. `book_isbn` carries no
//! foreign key: deleting a book leaves its completed loans in place, and
//! listings show a missing title instead of failing.
//!
//! # Examples
//!
//! ## Using Repositories Directly
//!
//! ```no_run
//! use shelfkeep_storage::{Database, DatabaseConfig};
//! use shelfkeep_storage::repositories::{BookRepository, SqliteBookRepository};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DatabaseConfig::new("shelfkeep.db").max_connections(4);
//!
//! let db = Database::new(config).await?;
//! let books = SqliteBookRepository::new(db.pool().clone());
//!
//! for book in books.find_all().await? {
//!     println!("{} ({}/{})", book.title, book.available_copies, book.total_copies);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Transaction Support for Multistep Operations
//!
//! ```no_run
//! use shelfkeep_storage::{Database, DatabaseConfig, transaction};
//! use chrono::Utc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::new(DatabaseConfig::new("shelfkeep.db")).await?;
//!
//! let mut tx = db.pool().begin().await?;
//! if let Some(loan) = transaction::find_loan(&mut tx, 42).await? {
//!     transaction::complete_loan(&mut tx, loan.id, Utc::now()).await?;
//!     transaction::increment_available(&mut tx, &loan.book_isbn).await?;
//! }
//!
//! // Commit transaction (both updates succeed or both fail)
//! tx.commit().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Security Considerations
//!
//! All queries use parameterized statements via SQLx. Title, author, name
//! and email are user-supplied text and are never concatenated into SQL.
//! The credential hash column is excluded from serialized output.

pub mod connection;
pub mod error;
pub mod models;
pub mod repositories;
pub mod transaction;

pub use connection::{Database, DatabaseConfig};
pub use error::{StorageError, StorageResult};
pub use models::{Book, BookStatus, Loan, LoanStatus, LoanView, UserRecord};
pub use repositories::{
    BookRepository, LoanRepository, SqliteBookRepository, SqliteLoanRepository,
    SqliteUserRepository, UserRepository,
};
