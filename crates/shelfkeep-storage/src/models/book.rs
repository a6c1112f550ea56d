use serde::{Deserialize, Serialize};

/// Catalogue entry with its copy count
///
/// # Fields
///
/// * `isbn` - Unique, immutable catalogue key
/// * `title` - Book title, 1-255 characters
/// * `author` - Author string, 1-255 characters
/// * `total_copies` - Physical copies owned, never negative
/// * `available_copies` - Copies on the shelf, `0 <= available_copies <= total_copies`
///
/// # Database Schema
///
/// Maps to the `books` table. The copy-count invariant is enforced by a
/// CHECK constraint in addition to the guarded updates issued by the
/// lending engine.
///
/// # Examples
///
/// ```
/// use shelfkeep_storage::models::{Book, BookStatus};
///
/// let book = Book::new("ISBN-1", "Dune", "Frank Herbert", 2);
/// assert_eq!(book.available_copies, 2);
/// assert_eq!(book.status(), BookStatus::Available);
///
/// // Shrinking below the borrowed count is refused
/// let mut lent = book.clone();
/// lent.available_copies = 0;
/// assert!(lent.resized(1).is_none());
/// assert_eq!(lent.resized(3).unwrap().available_copies, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Book {
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub total_copies: i64,
    pub available_copies: i64,
}

/// Shelf status derived from the available copy count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookStatus {
    /// At least one copy on the shelf
    Available,
    /// Every copy is out on loan (or the title has no copies)
    Borrowed,
}

impl BookStatus {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::Borrowed => "Borrowed",
        }
    }
}

impl Book {
    /// Create a catalogue entry with every copy available.
    pub fn new(
        isbn: impl Into<String>,
        title: impl Into<String>,
        author: impl Into<String>,
        total_copies: u32,
    ) -> Self {
        Self {
            isbn: isbn.into(),
            title: title.into(),
            author: author.into(),
            total_copies: i64::from(total_copies),
            available_copies: i64::from(total_copies),
        }
    }

    pub fn status(&self) -> BookStatus {
        if self.is_available() {
            BookStatus::Available
        } else {
            BookStatus::Borrowed
        }
    }

    pub fn is_available(&self) -> bool {
        self.available_copies > 0
    }

    /// Copies currently out on loan.
    pub fn borrowed_copies(&self) -> i64 {
        self.total_copies - self.available_copies
    }

    /// Returns `true` if the copy-count invariant holds.
    pub fn has_consistent_counts(&self) -> bool {
        self.total_copies >= 0
            && self.available_copies >= 0
            && self.available_copies <= self.total_copies
    }

    /// Copy of this book with a new total, keeping the borrowed count.
    ///
    /// Returns `None` if `new_total` is below the number of copies on loan.
    pub fn resized(&self, new_total: u32) -> Option<Self> {
        let new_total = i64::from(new_total);
        let borrowed = self.borrowed_copies();
        if new_total < borrowed {
            return None;
        }

        Some(Self {
            total_copies: new_total,
            available_copies: new_total - borrowed,
            ..self.clone()
        })
    }

    /// Case-insensitive substring match over title, author or isbn.
    ///
    /// `needle` must already be lowercase.
    pub fn matches_lowercase(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.author.to_lowercase().contains(needle)
            || self.isbn.to_lowercase().contains(needle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn lent_book(total: u32, available: i64) -> Book {
        let mut book = Book::new("ISBN-1", "Dune", "Frank Herbert", total);
        book.available_copies = available;
        book
    }

    #[test]
    fn test_new_book_fully_available() {
        let book = Book::new("ISBN-1", "Dune", "Frank Herbert", 3);
        assert_eq!(book.total_copies, 3);
        assert_eq!(book.available_copies, 3);
        assert_eq!(book.borrowed_copies(), 0);
        assert!(book.has_consistent_counts());
    }

    #[test]
    fn test_status_follows_available_copies() {
        assert_eq!(lent_book(2, 1).status(), BookStatus::Available);
        assert_eq!(lent_book(2, 0).status(), BookStatus::Borrowed);
        assert_eq!(lent_book(0, 0).status(), BookStatus::Borrowed);
    }

    #[rstest]
    #[case(5, 2, 3, Some(0))] // exactly the borrowed count
    #[case(5, 2, 10, Some(7))]
    #[case(5, 2, 5, Some(2))]
    #[case(5, 2, 2, None)] // below borrowed count
    #[case(5, 5, 0, Some(0))]
    fn test_resized(
        #[case] total: u32,
        #[case] available: i64,
        #[case] new_total: u32,
        #[case] expected_available: Option<i64>,
    ) {
        let book = lent_book(total, available);
        let resized = book.resized(new_total);
        assert_eq!(resized.as_ref().map(|b| b.available_copies), expected_available);

        if let Some(resized) = resized {
            assert_eq!(resized.borrowed_copies(), book.borrowed_copies());
            assert!(resized.has_consistent_counts());
        }
    }

    #[rstest]
    #[case("dune", true)]
    #[case("HERBERT", false)] // needle must be lowercase
    #[case("herbert", true)]
    #[case("isbn-1", true)]
    #[case("asimov", false)]
    fn test_matches_lowercase(#[case] needle: &str, #[case] expected: bool) {
        let book = lent_book(1, 1);
        assert_eq!(book.matches_lowercase(needle), expected);
    }
}
