//! Data models for the Livros catalog

pub mod book;
pub mod query;

// Re-export commonly used types
pub use book::{current_year, Book, BookId, BookInput, BookPayload, LoanStatus, MIN_YEAR};
pub use query::{BookFilter, BookPage, SortDirection, SortField, SortState, PAGE_SIZE};
