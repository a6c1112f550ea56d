#![allow(async_fn_in_trait)]

use crate::error::StorageResult;
use crate::models::Book;
use sqlx::SqlitePool;

/// Repository trait for catalogue entries (the catalog store)
///
/// Reads and single-row inserts only. Copy-count mutations go through the
/// [`transaction`](crate::transaction) module so the lending engine can pair
/// them with ledger writes atomically.
pub trait BookRepository: Send + Sync {
    /// Find a book by ISBN
    async fn find_by_isbn(&self, isbn: &str) -> StorageResult<Option<Book>>;

    /// Check if an ISBN is already catalogued
    async fn exists(&self, isbn: &str) -> StorageResult<bool>;

    /// Get all books ordered by title
    async fn find_all(&self) -> StorageResult<Vec<Book>>;

    /// Insert a new book
    async fn create(&self, book: &Book) -> StorageResult<()>;

    /// Count catalogue entries
    async fn count(&self) -> StorageResult<i64>;
}

/// SQLite implementation of BookRepository
pub struct SqliteBookRepository {
    pool: SqlitePool,
}

impl SqliteBookRepository {
    /// Create a new SQLite book repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl BookRepository for SqliteBookRepository {
    async fn find_by_isbn(&self, isbn: &str) -> StorageResult<Option<Book>> {
        let mut conn = self.pool.acquire().await?;
        crate::transaction::find_book(&mut conn, isbn).await
    }

    async fn exists(&self, isbn: &str) -> StorageResult<bool> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM books WHERE isbn = ?")
            .bind(isbn)
            .fetch_one(&self.pool)
            .await?;

        Ok(result.0 > 0)
    }

    async fn find_all(&self) -> StorageResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(
            r#"
            SELECT isbn, title, author, total_copies, available_copies
            FROM books
            ORDER BY title, isbn
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    async fn create(&self, book: &Book) -> StorageResult<()> {
        let mut conn = self.pool.acquire().await?;
        crate::transaction::create_book(&mut conn, book).await
    }

    async fn count(&self) -> StorageResult<i64> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;

        Ok(result.0)
    }
}
