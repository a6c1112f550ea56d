//! The lending engine.
//!
//! [`LendingService`] is the only writer of copy counts and loan status. Each
//! multi-step mutation (register, borrow, return, catalogue edits) runs inside
//! one SQLite transaction: every check and write goes through the
//! transaction's connection, and any early return drops the transaction so
//! nothing partial is committed.
//!
//! # Session
//!
//! The service holds at most one authenticated user. [`authenticate`]
//! replaces it and [`logout`] clears it; neither touches storage state.
//!
//! [`authenticate`]: LendingService::authenticate
//! [`logout`]: LendingService::logout

use crate::clock::{Clock, SystemClock};
use crate::config::LendingConfig;
use crate::error::{LendingError, LendingResult};
use crate::events::{ChangeNotifier, StateChanged};
use crate::stats::LibraryStatistics;
use shelfkeep_core::credential::{hash_credential, verify_credential};
use shelfkeep_core::validation::{
    normalize_email, validate_author, validate_email, validate_isbn, validate_name,
    validate_password, validate_title,
};
use shelfkeep_core::{Role, User, UserFactory};
use shelfkeep_storage::models::{Book, Loan, LoanStatus, LoanView, UserRecord};
use shelfkeep_storage::repositories::{
    BookRepository, LoanRepository, SqliteBookRepository, SqliteLoanRepository,
    SqliteUserRepository, UserRepository,
};
use shelfkeep_storage::{Database, transaction};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Log a failed operation at a level matching its kind.
fn log_failure(operation: &'static str, err: &LendingError) {
    if err.is_fault() {
        error!(operation, error = ?err, "Lending operation failed");
    } else {
        warn!(operation, reason = %err, "Lending operation rejected");
    }
}

/// Orchestrates accounts, catalogue and loans over one [`Database`].
pub struct LendingService {
    db: Database,
    users: SqliteUserRepository,
    books: SqliteBookRepository,
    loans: SqliteLoanRepository,
    config: LendingConfig,
    clock: Arc<dyn Clock>,
    notifier: ChangeNotifier,
    session: Option<User>,
}

impl LendingService {
    /// Create a service over an open database.
    ///
    /// # Errors
    ///
    /// Returns [`LendingError::Configuration`] if `config` is out of range.
    pub fn new(db: Database, config: LendingConfig) -> LendingResult<Self> {
        config.validate()?;

        let pool = db.pool().clone();
        Ok(Self {
            users: SqliteUserRepository::new(pool.clone()),
            books: SqliteBookRepository::new(pool.clone()),
            loans: SqliteLoanRepository::new(pool),
            notifier: ChangeNotifier::new(config.notify_capacity),
            clock: Arc::new(SystemClock),
            session: None,
            config,
            db,
        })
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &LendingConfig {
        &self.config
    }

    /// Receive a [`StateChanged`] after every successful mutation.
    pub fn subscribe(&self) -> broadcast::Receiver<StateChanged> {
        self.notifier.subscribe()
    }

    // ========================================================================
    // Accounts and session
    // ========================================================================

    /// Register a new account and return it.
    ///
    /// `role` is matched case-insensitively against `student`, `faculty`,
    /// `librarian` and `head librarian`. The id is the role prefix followed by
    /// the next free sequence number for that prefix.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: &str,
    ) -> LendingResult<User> {
        let user = self
            .try_register(name, email, password, role)
            .await
            .inspect_err(|e| log_failure("register", e))?;

        info!(user_id = %user.id, role = user.user_type(), "User registered");
        self.notifier.notify();
        Ok(user)
    }

    async fn try_register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: &str,
    ) -> LendingResult<User> {
        let email = normalize_email(email);
        validate_name(name)?;
        validate_email(&email)?;
        validate_password(password)?;
        let role: Role = role
            .parse()
            .map_err(|_| LendingError::InvalidRole(role.to_string()))?;

        let credential_hash = hash_credential(password);

        let mut tx = self.db.pool().begin().await?;

        if transaction::email_taken(&mut tx, &email).await? {
            return Err(LendingError::EmailTaken(email));
        }

        let prefix = role.id_prefix();
        let sequence = transaction::next_user_sequence(&mut tx, prefix).await?;
        let id = format!("{prefix}{sequence}");

        let user = UserFactory::create_at(
            role,
            &id,
            name.trim(),
            &email,
            &credential_hash,
            self.clock.now(),
        );
        transaction::insert_user(&mut tx, &UserRecord::from_user(&user))
            .await
            .map_err(|e| {
                if e.is_unique_violation() {
                    LendingError::EmailTaken(email.clone())
                } else {
                    e.into()
                }
            })?;

        tx.commit().await?;
        Ok(user)
    }

    /// Log in by email and password, replacing any current session.
    ///
    /// Every kind of mismatch (unknown email, wrong password, unreadable
    /// stored role) yields the same [`LendingError::AuthFailed`].
    pub async fn authenticate(&mut self, email: &str, password: &str) -> LendingResult<User> {
        self.session = None;

        let user = self
            .try_authenticate(email, password)
            .await
            .inspect_err(|e| log_failure("authenticate", e))?;

        info!(user_id = %user.id, "User authenticated");
        self.session = Some(user.clone());
        Ok(user)
    }

    async fn try_authenticate(&self, email: &str, password: &str) -> LendingResult<User> {
        let record = self
            .users
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or(LendingError::AuthFailed)?;

        if !verify_credential(password, &record.credential_hash) {
            return Err(LendingError::AuthFailed);
        }

        record.into_user().ok_or(LendingError::AuthFailed)
    }

    pub fn logout(&mut self) {
        if let Some(user) = self.session.take() {
            info!(user_id = %user.id, "User logged out");
        }
    }

    pub fn current_user(&self) -> Option<&User> {
        self.session.as_ref()
    }

    /// All users whose stored role is recognized, sorted by name.
    pub async fn list_users(&self) -> LendingResult<Vec<User>> {
        let records = self
            .users
            .find_all()
            .await
            .map_err(LendingError::from)
            .inspect_err(|e| log_failure("list_users", e))?;

        Ok(records.into_iter().filter_map(UserRecord::into_user).collect())
    }

    pub async fn find_user(&self, user_id: &str) -> LendingResult<User> {
        self.load_user(user_id)
            .await
            .inspect_err(|e| log_failure("find_user", e))
    }

    async fn load_user(&self, user_id: &str) -> LendingResult<User> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| LendingError::UnknownUser(user_id.to_string()))?
            .into_user()
            .ok_or_else(|| {
                LendingError::Inconsistent(format!("user {user_id} has an unrecognized role"))
            })
    }

    /// Persist the role-specific profile of an existing user.
    ///
    /// Id, name, email, credential and role are immutable; the stored role
    /// must match the variant of `user`.
    pub async fn update_profile(&self, user: &User) -> LendingResult<()> {
        self.try_update_profile(user)
            .await
            .inspect_err(|e| log_failure("update_profile", e))?;

        info!(user_id = %user.id, "Profile updated");
        self.notifier.notify();
        Ok(())
    }

    async fn try_update_profile(&self, user: &User) -> LendingResult<()> {
        let stored = self.load_user(&user.id).await?;
        if stored.role() != user.role() {
            return Err(shelfkeep_core::Error::WrongRole {
                expected: stored.user_type(),
                actual: user.user_type(),
            }
            .into());
        }

        self.users.update_profile(&UserRecord::from_user(user)).await?;
        Ok(())
    }

    /// Add `cents` to a student's outstanding fines.
    pub async fn record_fine(&self, user_id: &str, cents: i64) -> LendingResult<User> {
        let user = self
            .adjust_fines(user_id, |user| user.add_fine(cents))
            .await
            .inspect_err(|e| log_failure("record_fine", e))?;

        info!(user_id, cents, balance = user.fines_cents(), "Fine recorded");
        self.notifier.notify();
        Ok(user)
    }

    /// Settle `cents` of a student's outstanding fines.
    pub async fn pay_fine(&self, user_id: &str, cents: i64) -> LendingResult<User> {
        let user = self
            .adjust_fines(user_id, |user| user.pay_fine(cents))
            .await
            .inspect_err(|e| log_failure("pay_fine", e))?;

        info!(user_id, cents, balance = user.fines_cents(), "Fine paid");
        self.notifier.notify();
        Ok(user)
    }

    async fn adjust_fines<F>(&self, user_id: &str, adjust: F) -> LendingResult<User>
    where
        F: FnOnce(&mut User) -> shelfkeep_core::Result<()>,
    {
        let mut user = self.load_user(user_id).await?;
        adjust(&mut user)?;
        self.users.update_profile(&UserRecord::from_user(&user)).await?;
        Ok(user)
    }

    /// Seed a Head Librarian account if no user exists yet.
    ///
    /// Returns the new account, or `None` when users are already present.
    pub async fn ensure_admin(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> LendingResult<Option<User>> {
        let count = self
            .users
            .count()
            .await
            .map_err(LendingError::from)
            .inspect_err(|e| log_failure("ensure_admin", e))?;

        if count > 0 {
            debug!(users = count, "Users present, skipping admin seed");
            return Ok(None);
        }

        let admin = self
            .register(name, email, password, Role::HeadLibrarian.as_str())
            .await?;
        Ok(Some(admin))
    }

    // ========================================================================
    // Catalogue
    // ========================================================================

    /// Every book, sorted by title.
    pub async fn list_books(&self) -> LendingResult<Vec<Book>> {
        self.books
            .find_all()
            .await
            .map_err(LendingError::from)
            .inspect_err(|e| log_failure("list_books", e))
    }

    /// Case-insensitive substring search over title, author and ISBN.
    ///
    /// The term is matched as given, surrounding whitespace included. An
    /// empty term returns the full listing.
    pub async fn search_books(&self, term: &str) -> LendingResult<Vec<Book>> {
        let needle = term.to_lowercase();
        let books = self.list_books().await?;

        if needle.is_empty() {
            return Ok(books);
        }
        Ok(books
            .into_iter()
            .filter(|book| book.matches_lowercase(&needle))
            .collect())
    }

    pub async fn find_book(&self, isbn: &str) -> LendingResult<Book> {
        self.books
            .find_by_isbn(isbn.trim())
            .await
            .map_err(LendingError::from)
            .and_then(|book| book.ok_or_else(|| LendingError::UnknownBook(isbn.to_string())))
            .inspect_err(|e| log_failure("find_book", e))
    }

    /// Catalogue a new title with every copy on the shelf.
    pub async fn add_book(
        &self,
        isbn: &str,
        title: &str,
        author: &str,
        total_copies: u32,
    ) -> LendingResult<Book> {
        let book = self
            .try_add_book(isbn, title, author, total_copies)
            .await
            .inspect_err(|e| log_failure("add_book", e))?;

        info!(isbn = %book.isbn, copies = total_copies, "Book added");
        self.notifier.notify();
        Ok(book)
    }

    async fn try_add_book(
        &self,
        isbn: &str,
        title: &str,
        author: &str,
        total_copies: u32,
    ) -> LendingResult<Book> {
        validate_isbn(isbn)?;
        validate_title(title)?;
        validate_author(author)?;

        let book = Book::new(isbn.trim(), title.trim(), author.trim(), total_copies);

        let mut tx = self.db.pool().begin().await?;

        if transaction::find_book(&mut tx, &book.isbn).await?.is_some() {
            return Err(LendingError::DuplicateIsbn(book.isbn));
        }
        transaction::create_book(&mut tx, &book).await.map_err(|e| {
            if e.is_unique_violation() {
                LendingError::DuplicateIsbn(book.isbn.clone())
            } else {
                e.into()
            }
        })?;

        tx.commit().await?;
        Ok(book)
    }

    /// Change title, author and total copies, keeping the borrowed count.
    ///
    /// # Errors
    ///
    /// [`LendingError::BelowBorrowedCount`] if `new_total` is smaller than the
    /// number of copies currently on loan.
    pub async fn update_book(
        &self,
        isbn: &str,
        title: &str,
        author: &str,
        new_total: u32,
    ) -> LendingResult<Book> {
        let book = self
            .try_update_book(isbn, title, author, new_total)
            .await
            .inspect_err(|e| log_failure("update_book", e))?;

        info!(
            isbn = %book.isbn,
            total = book.total_copies,
            available = book.available_copies,
            "Book updated"
        );
        self.notifier.notify();
        Ok(book)
    }

    async fn try_update_book(
        &self,
        isbn: &str,
        title: &str,
        author: &str,
        new_total: u32,
    ) -> LendingResult<Book> {
        validate_title(title)?;
        validate_author(author)?;
        let isbn = isbn.trim();

        let mut tx = self.db.pool().begin().await?;

        let current = transaction::find_book(&mut tx, isbn)
            .await?
            .ok_or_else(|| LendingError::UnknownBook(isbn.to_string()))?;

        let mut updated = current
            .resized(new_total)
            .ok_or(LendingError::BelowBorrowedCount {
                requested: new_total,
                borrowed: current.borrowed_copies(),
            })?;
        updated.title = title.trim().to_string();
        updated.author = author.trim().to_string();

        if !transaction::update_book(&mut tx, &updated).await? {
            return Err(LendingError::Inconsistent(format!(
                "book {isbn} vanished during update"
            )));
        }

        tx.commit().await?;
        Ok(updated)
    }

    /// Remove a title that has no open loans.
    pub async fn delete_book(&self, isbn: &str) -> LendingResult<()> {
        let isbn = isbn.trim();
        self.try_delete_book(isbn)
            .await
            .inspect_err(|e| log_failure("delete_book", e))?;

        info!(isbn, "Book deleted");
        self.notifier.notify();
        Ok(())
    }

    async fn try_delete_book(&self, isbn: &str) -> LendingResult<()> {
        let mut tx = self.db.pool().begin().await?;

        let open = transaction::count_open_loans_for_book(&mut tx, isbn).await?;
        if open > 0 {
            return Err(LendingError::HasActiveLoans {
                isbn: isbn.to_string(),
                open,
            });
        }
        if !transaction::delete_book(&mut tx, isbn).await? {
            return Err(LendingError::UnknownBook(isbn.to_string()));
        }

        tx.commit().await?;
        Ok(())
    }

    // ========================================================================
    // Loans
    // ========================================================================

    /// Lend one copy of `isbn` to `user_id`.
    ///
    /// Checks run in order and the first failure wins: the user exists, the
    /// book exists and has a copy on the shelf, the user does not already hold
    /// this title, and (when enforced) the user is below their borrow limit.
    /// The copy-count decrement and the new loan commit together.
    pub async fn borrow_book(&self, user_id: &str, isbn: &str) -> LendingResult<Loan> {
        let loan = self
            .try_borrow_book(user_id.trim(), isbn.trim())
            .await
            .inspect_err(|e| log_failure("borrow_book", e))?;

        info!(
            loan_id = loan.id,
            user_id = %loan.user_id,
            isbn = %loan.book_isbn,
            due = %loan.due_date,
            "Book borrowed"
        );
        self.notifier.notify();
        Ok(loan)
    }

    async fn try_borrow_book(&self, user_id: &str, isbn: &str) -> LendingResult<Loan> {
        let mut tx = self.db.pool().begin().await?;

        let user = transaction::find_user(&mut tx, user_id)
            .await?
            .ok_or_else(|| LendingError::UnknownUser(user_id.to_string()))?
            .into_user()
            .ok_or_else(|| {
                LendingError::Inconsistent(format!("user {user_id} has an unrecognized role"))
            })?;

        let book = transaction::find_book(&mut tx, isbn)
            .await?
            .ok_or_else(|| LendingError::UnknownBook(isbn.to_string()))?;
        if !book.is_available() {
            return Err(LendingError::OutOfStock(book.isbn));
        }

        if transaction::has_open_loan(&mut tx, user_id, isbn).await? {
            return Err(LendingError::AlreadyBorrowed {
                user_id: user_id.to_string(),
                isbn: isbn.to_string(),
            });
        }

        if self.config.enforce_borrow_limit {
            let open = transaction::count_open_loans_for_user(&mut tx, user_id).await?;
            if !user.can_borrow_more(u32::try_from(open).unwrap_or(u32::MAX)) {
                return Err(LendingError::BorrowLimitReached {
                    user_id: user_id.to_string(),
                    limit: user.max_books_allowed(),
                });
            }
        }

        if !transaction::decrement_available(&mut tx, isbn).await? {
            return Err(LendingError::OutOfStock(isbn.to_string()));
        }

        let borrow_date = self.clock.now();
        let due_date = borrow_date + self.config.loan_period();
        let id = transaction::create_loan(&mut tx, user_id, isbn, borrow_date, due_date).await?;

        tx.commit().await?;

        Ok(Loan {
            id,
            user_id: user_id.to_string(),
            book_isbn: isbn.to_string(),
            borrow_date,
            due_date,
            return_date: None,
            status: LoanStatus::Active,
        })
    }

    /// Close an open loan and put its copy back on the shelf.
    ///
    /// A loan whose book has since been deleted is still closed; only the
    /// copy-count step is skipped.
    pub async fn return_book(&self, transaction_id: i64) -> LendingResult<Loan> {
        let loan = self
            .try_return_book(transaction_id)
            .await
            .inspect_err(|e| log_failure("return_book", e))?;

        info!(
            loan_id = loan.id,
            user_id = %loan.user_id,
            isbn = %loan.book_isbn,
            "Book returned"
        );
        self.notifier.notify();
        Ok(loan)
    }

    async fn try_return_book(&self, transaction_id: i64) -> LendingResult<Loan> {
        let mut tx = self.db.pool().begin().await?;

        let mut loan = transaction::find_loan(&mut tx, transaction_id)
            .await?
            .ok_or(LendingError::TransactionNotFound(transaction_id))?;
        if !loan.is_open() {
            return Err(LendingError::AlreadyCompleted(transaction_id));
        }

        match transaction::find_book(&mut tx, &loan.book_isbn).await? {
            Some(_) => {
                if !transaction::increment_available(&mut tx, &loan.book_isbn).await? {
                    return Err(LendingError::Inconsistent(format!(
                        "every copy of {} is already on the shelf",
                        loan.book_isbn
                    )));
                }
            }
            None => warn!(
                loan_id = transaction_id,
                isbn = %loan.book_isbn,
                "Returned loan references a deleted book"
            ),
        }

        let returned_at = self.clock.now();
        if !transaction::complete_loan(&mut tx, transaction_id, returned_at).await? {
            return Err(LendingError::AlreadyCompleted(transaction_id));
        }

        tx.commit().await?;

        loan.status = LoanStatus::Completed;
        loan.return_date = Some(returned_at);
        Ok(loan)
    }

    /// Mark every past-due active loan overdue. Returns how many changed.
    pub async fn sweep_overdue(&self) -> LendingResult<u64> {
        let changed = self
            .loans
            .mark_overdue(self.clock.now())
            .await
            .map_err(LendingError::from)
            .inspect_err(|e| log_failure("sweep_overdue", e))?;

        if changed > 0 {
            info!(changed, "Loans marked overdue");
            self.notifier.notify();
        } else {
            debug!("Overdue sweep found nothing to change");
        }
        Ok(changed)
    }

    /// Every loan, newest first, with borrower name and book title.
    pub async fn list_transactions(&self) -> LendingResult<Vec<LoanView>> {
        self.loans
            .find_all_detailed()
            .await
            .map_err(LendingError::from)
            .inspect_err(|e| log_failure("list_transactions", e))
    }

    pub async fn user_transactions(&self, user_id: &str) -> LendingResult<Vec<LoanView>> {
        self.try_user_transactions(user_id)
            .await
            .inspect_err(|e| log_failure("user_transactions", e))
    }

    async fn try_user_transactions(&self, user_id: &str) -> LendingResult<Vec<LoanView>> {
        if self.users.find_by_id(user_id).await?.is_none() {
            return Err(LendingError::UnknownUser(user_id.to_string()));
        }
        Ok(self.loans.find_by_user_detailed(user_id).await?)
    }

    /// Loans of the logged-in user.
    pub async fn current_user_transactions(&self) -> LendingResult<Vec<LoanView>> {
        let Some(user) = &self.session else {
            let err = LendingError::NotAuthenticated;
            log_failure("current_user_transactions", &err);
            return Err(err);
        };
        self.user_transactions(&user.id).await
    }

    // ========================================================================
    // Statistics
    // ========================================================================

    /// Current counters. Reads only; see [`refresh_statistics`].
    ///
    /// [`refresh_statistics`]: LendingService::refresh_statistics
    pub async fn statistics(&self) -> LendingResult<LibraryStatistics> {
        self.try_statistics()
            .await
            .inspect_err(|e| log_failure("statistics", e))
    }

    async fn try_statistics(&self) -> LendingResult<LibraryStatistics> {
        Ok(LibraryStatistics {
            total_books: self.books.count().await?,
            total_users: self.users.count().await?,
            active_loans: self.loans.count_by_status(LoanStatus::Active).await?,
            overdue_loans: self.loans.count_by_status(LoanStatus::Overdue).await?,
        })
    }

    /// Run the overdue sweep, then read the counters.
    pub async fn refresh_statistics(&self) -> LendingResult<LibraryStatistics> {
        self.sweep_overdue().await?;
        self.statistics().await
    }
}
