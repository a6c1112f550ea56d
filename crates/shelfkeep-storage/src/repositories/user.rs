#![allow(async_fn_in_trait)]

use crate::error::{StorageError, StorageResult};
use crate::models::UserRecord;
use sqlx::SqlitePool;

/// Repository trait for account records (the credential store)
///
/// This trait defines the contract for user data access, enabling
/// testability through mock implementations and separation of concerns.
///
/// # Implementation Note
///
/// This trait uses native async trait methods (Edition 2024 feature),
/// eliminating the need for the async-trait crate while maintaining
/// full async/await support in trait methods.
pub trait UserRepository: Send + Sync {
    /// Find a user by id
    async fn find_by_id(&self, id: &str) -> StorageResult<Option<UserRecord>>;

    /// Find a user by normalized email (the login key)
    async fn find_by_email(&self, email: &str) -> StorageResult<Option<UserRecord>>;

    /// Get all users ordered by name
    async fn find_all(&self) -> StorageResult<Vec<UserRecord>>;

    /// Insert a new user
    async fn create(&self, user: &UserRecord) -> StorageResult<()>;

    /// Persist the role-specific profile columns of an existing user
    ///
    /// Identity, email, credential and role are immutable and not written.
    async fn update_profile(&self, user: &UserRecord) -> StorageResult<()>;

    /// Count registered users
    async fn count(&self) -> StorageResult<i64>;
}

/// SQLite implementation of UserRepository
pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    /// Create a new SQLite user repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl UserRepository for SqliteUserRepository {
    async fn find_by_id(&self, id: &str) -> StorageResult<Option<UserRecord>> {
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
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> StorageResult<Option<UserRecord>> {
        let user = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, name, email, credential_hash, user_type,
                   major, year_of_study, fines_cents,
                   department, position, hire_date, created_at
            FROM users
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_all(&self) -> StorageResult<Vec<UserRecord>> {
        let users = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, name, email, credential_hash, user_type,
                   major, year_of_study, fines_cents,
                   department, position, hire_date, created_at
            FROM users
            ORDER BY name, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn create(&self, user: &UserRecord) -> StorageResult<()> {
        let mut conn = self.pool.acquire().await?;
        crate::transaction::insert_user(&mut conn, user).await
    }

    async fn update_profile(&self, user: &UserRecord) -> StorageResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET major = ?, year_of_study = ?, fines_cents = ?,
                department = ?, position = ?, hire_date = ?
            WHERE id = ?
            "#,
        )
        .bind(&user.major)
        .bind(user.year_of_study)
        .bind(user.fines_cents)
        .bind(&user.department)
        .bind(&user.position)
        .bind(user.hire_date)
        .bind(&user.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("User", "id", &user.id));
        }

        Ok(())
    }

    async fn count(&self) -> StorageResult<i64> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(result.0)
    }
}
