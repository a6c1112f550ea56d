//! Lending engine for the shelfkeep library tracker.
//!
//! [`LendingService`] ties the account, catalogue and loan stores together
//! and keeps the copy-count bookkeeping consistent with the loan lifecycle:
//!
//! - A borrow decrements `available_copies` and appends an `Active` loan in
//!   one storage transaction.
//! - A return completes the loan and increments `available_copies` in one
//!   storage transaction.
//! - The overdue sweep flips past-due `Active` loans to `Overdue`.
//!
//! Presentation layers subscribe with [`LendingService::subscribe`] and
//! re-read their lists whenever a [`StateChanged`] arrives.
//!
//! # Examples
//!
//! ```no_run
//! use shelfkeep_lending::{LendingConfig, LendingService};
//! use shelfkeep_storage::{Database, DatabaseConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::new(DatabaseConfig::new("shelfkeep.db")).await?;
//! let mut library = LendingService::new(db, LendingConfig::default())?;
//!
//! let ann = library.register("Ann", "ann@x.edu", "secret1", "Student").await?;
//! library.add_book("ISBN-1", "Dune", "Frank Herbert", 2).await?;
//!
//! let loan = library.borrow_book(&ann.id, "ISBN-1").await?;
//! library.return_book(loan.id).await?;
//!
//! let me = library.authenticate("ann@x.edu", "secret1").await?;
//! assert_eq!(me.max_books_allowed(), 5);
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod service;
pub mod stats;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::LendingConfig;
pub use error::{LendingError, LendingResult};
pub use events::{ChangeNotifier, StateChanged};
pub use service::LendingService;
pub use stats::LibraryStatistics;
