//! Filter, sort and page types for catalog listing

use serde::{Deserialize, Serialize};

use super::book::{Book, LoanStatus};

/// Fixed number of records per page
pub const PAGE_SIZE: usize = 10;

/// Conjunctive filter criteria. Unset or empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookFilter {
    /// Case-insensitive substring over title and author
    pub text: String,
    pub genre: Option<String>,
    pub year: Option<i32>,
    pub status: Option<LoanStatus>,
}

impl BookFilter {
    pub fn matches(&self, book: &Book) -> bool {
        if let Some(genre) = self.genre.as_deref().filter(|g| !g.is_empty()) {
            if book.genre.as_deref() != Some(genre) {
                return false;
            }
        }
        if self.year.is_some_and(|year| book.year != year) {
            return false;
        }
        if self.status.is_some_and(|status| book.status != status) {
            return false;
        }
        if self.text.is_empty() {
            return true;
        }
        let needle = self.text.to_lowercase();
        book.title.to_lowercase().contains(&needle) || book.author.to_lowercase().contains(&needle)
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
            && self.genre.as_deref().map_or(true, str::is_empty)
            && self.year.is_none()
            && self.status.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortField {
    #[default]
    #[serde(rename = "titulo")]
    Title,
    #[serde(rename = "ano")]
    Year,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    #[serde(rename = "asc")]
    Asc,
    #[serde(rename = "desc")]
    Desc,
}

/// Sort state; persisted as `{"campo": ..., "direcao": ...}`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    #[serde(rename = "campo")]
    pub field: SortField,
    #[serde(rename = "direcao")]
    pub direction: SortDirection,
}

/// One page of query results
#[derive(Debug, Clone, PartialEq)]
pub struct BookPage {
    pub books: Vec<Book>,
    /// Matches after filtering, before pagination
    pub total: usize,
    /// Requested 1-based page
    pub page: usize,
    pub page_count: usize,
}

impl BookPage {
    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }
}
