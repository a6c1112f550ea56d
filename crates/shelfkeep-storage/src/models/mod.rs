pub mod book;
pub mod loan;
pub mod user;

pub use book::{Book, BookStatus};
pub use loan::{Loan, LoanStatus, LoanView};
pub use user::UserRecord;
