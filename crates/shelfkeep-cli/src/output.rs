//! Plain-text rendering for terminal output.

use shelfkeep_core::{Profile, User};
use shelfkeep_lending::LibraryStatistics;
use shelfkeep_storage::{Book, LoanView};

pub fn user_line(user: &User) -> String {
    let detail = match &user.profile {
        Profile::Student(p) => format!(
            "{}, year {}, fines {}",
            p.major,
            p.year,
            cents(p.fines_cents)
        ),
        Profile::Faculty(p) => format!("{}, {}", p.department, p.position),
        Profile::Librarian(p) => format!("hired {}", p.hire_date.format("%Y-%m-%d")),
    };

    format!(
        "{:<8} {:<24} {:<28} {:<15} {}",
        user.id,
        user.name,
        user.email,
        user.user_type(),
        detail
    )
}

pub fn book_line(book: &Book) -> String {
    format!(
        "{:<16} {:<32} {:<24} {:>3}/{:<3} {}",
        book.isbn,
        book.title,
        book.author,
        book.available_copies,
        book.total_copies,
        book.status().display_name()
    )
}

pub fn loan_line(view: &LoanView) -> String {
    let loan = &view.loan;
    let returned = loan
        .return_date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string());

    format!(
        "#{:<5} {:<8} {:<20} {:<16} {:<28} due {} returned {:<10} {}",
        loan.id,
        loan.user_id,
        view.user_name.as_deref().unwrap_or("(unknown user)"),
        loan.book_isbn,
        view.book_title.as_deref().unwrap_or("(deleted book)"),
        loan.due_date.format("%Y-%m-%d"),
        returned,
        loan.status
    )
}

pub fn statistics_block(stats: &LibraryStatistics) -> String {
    format!(
        "Books:          {}\nUsers:          {}\nActive loans:   {}\nOverdue loans:  {}",
        stats.total_books, stats.total_users, stats.active_loans, stats.overdue_loans
    )
}

pub fn cents(amount: i64) -> String {
    format!("{}.{:02}", amount / 100, amount % 100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelfkeep_core::{Role, UserFactory};

    #[test]
    fn test_cents() {
        assert_eq!(cents(0), "0.00");
        assert_eq!(cents(5), "0.05");
        assert_eq!(cents(1250), "12.50");
    }

    #[test]
    fn test_book_line_shows_counts_and_status() {
        let mut book = Book::new("ISBN-1", "Dune", "Frank Herbert", 2);
        book.available_copies = 0;
        let line = book_line(&book);
        assert!(line.contains("0/2"));
        assert!(line.ends_with("Borrowed"));
    }

    #[test]
    fn test_user_line_never_prints_credential() {
        let user =
            UserFactory::create_for_role(Role::Student, "STU100", "Ann", "ann@x.edu", "salt:abc");
        let line = user_line(&user);
        assert!(line.starts_with("STU100"));
        assert!(!line.contains("salt:abc"));
    }
}
