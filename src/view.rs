//! View models: what a page of the catalog looks like, independent of the
//! terminal (or any other surface) that ends up drawing it.

use std::fmt;

use crate::{
    models::{Book, BookId, BookPage, LoanStatus},
    repository::LoanAction,
    services::query::FilterOptions,
};

pub const EMPTY_MESSAGE: &str = "No books found.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookCard {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub year: i32,
    /// Genre, or `-` when absent
    pub genre: String,
    pub status: LoanStatus,
    pub loan_date: Option<String>,
}

impl From<&Book> for BookCard {
    fn from(book: &Book) -> Self {
        Self {
            id: book.id.clone(),
            title: book.title.clone(),
            author: book.author.clone(),
            year: book.year,
            genre: book
                .genre
                .as_deref()
                .filter(|g| !g.is_empty())
                .unwrap_or("-")
                .to_string(),
            status: book.status,
            loan_date: book.loan_date.map(|d| d.format("%Y-%m-%d").to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageButton {
    pub number: usize,
    /// The page being shown; drawn disabled
    pub current: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogView {
    pub cards: Vec<BookCard>,
    pub empty_message: Option<&'static str>,
    pub pagination: Vec<PageButton>,
    pub total: usize,
}

pub fn render(page: &BookPage) -> CatalogView {
    let cards: Vec<BookCard> = page.books.iter().map(BookCard::from).collect();
    let empty_message = cards.is_empty().then_some(EMPTY_MESSAGE);
    let pagination = (1..=page.page_count)
        .map(|number| PageButton {
            number,
            current: number == page.page,
        })
        .collect();

    CatalogView {
        cards,
        empty_message,
        pagination,
        total: page.total,
    }
}

impl fmt::Display for BookCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[{}] {}", self.id, self.title)?;
        writeln!(f, "    {}", self.author)?;
        writeln!(f, "    Year: {}  Genre: {}", self.year, self.genre)?;
        match &self.loan_date {
            Some(date) => write!(f, "    Status: {} (since {})", self.status.label(), date),
            None => write!(f, "    Status: {}", self.status.label()),
        }
    }
}

impl fmt::Display for CatalogView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(message) = self.empty_message {
            writeln!(f, "{}", message)?;
        }
        for card in &self.cards {
            writeln!(f, "{}", card)?;
        }
        if !self.pagination.is_empty() {
            let buttons: Vec<String> = self
                .pagination
                .iter()
                .map(|b| {
                    if b.current {
                        format!("[{}]", b.number)
                    } else {
                        b.number.to_string()
                    }
                })
                .collect();
            writeln!(f, "Pages: {}  ({} books)", buttons.join(" "), self.total)?;
        }
        Ok(())
    }
}

/// Details shown before a loan or return is confirmed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanPrompt {
    pub title: String,
    pub author: String,
    pub status: LoanStatus,
    pub action: LoanAction,
}

impl LoanPrompt {
    pub fn for_book(book: &Book) -> Self {
        Self {
            title: book.title.clone(),
            author: book.author.clone(),
            status: book.status,
            action: LoanAction::toggling(book),
        }
    }
}

impl fmt::Display for LoanPrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.action {
            LoanAction::Lend => "Lend",
            LoanAction::Return => "Return",
        };
        write!(
            f,
            "{} - {} (status: {}). {} it?",
            self.title,
            self.author,
            self.status.label(),
            verb
        )
    }
}

impl fmt::Display for FilterOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Genres: All, {}", self.genres.join(", "))?;
        let years: Vec<String> = self.years.iter().map(i32::to_string).collect();
        write!(f, "Years: All, {}", years.join(", "))
    }
}
