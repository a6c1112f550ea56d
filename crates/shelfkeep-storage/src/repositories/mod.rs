pub mod book;
pub mod loan;
pub mod user;

pub use book::{BookRepository, SqliteBookRepository};
pub use loan::{LoanRepository, SqliteLoanRepository};
pub use user::{SqliteUserRepository, UserRepository};
