//! Repository layer: where book records come from and mutations go to

pub mod http;
pub mod local;

use async_trait::async_trait;
use std::sync::Arc;

use crate::{
    config::AppConfig,
    error::AppResult,
    models::{Book, BookId, BookPayload},
    services::storage::KeyValueStore,
};

/// Loan transition requested from the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanAction {
    Lend,
    Return,
}

impl LoanAction {
    /// Action that flips a book out of its current status
    pub fn toggling(book: &Book) -> Self {
        if book.is_on_loan() {
            LoanAction::Return
        } else {
            LoanAction::Lend
        }
    }

    /// Path segment under `/livros/{id}/`
    pub fn path_segment(&self) -> &'static str {
        match self {
            LoanAction::Lend => "emprestar",
            LoanAction::Return => "devolver",
        }
    }
}

/// Book resource operations.
///
/// Mutations return `Ok(None)` when the backend accepted the change but did
/// not echo the resulting record; callers reload the collection in that case.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BooksRepository: Send + Sync {
    async fn list(&self) -> AppResult<Vec<Book>>;

    async fn create(&self, payload: &BookPayload) -> AppResult<Option<Book>>;

    async fn update(&self, id: &BookId, payload: &BookPayload) -> AppResult<Option<Book>>;

    async fn delete(&self, id: &BookId) -> AppResult<()>;

    async fn set_loan(&self, id: &BookId, action: LoanAction) -> AppResult<Option<Book>>;
}

/// Pick the backend from configuration
pub fn from_config(
    config: &AppConfig,
    store: Arc<dyn KeyValueStore>,
) -> AppResult<Arc<dyn BooksRepository>> {
    if config.api.offline {
        tracing::info!("Using local fallback backend");
        Ok(Arc::new(local::LocalBooksRepository::open(store)))
    } else {
        tracing::info!("Using backend at {}", config.books_url());
        Ok(Arc::new(http::HttpBooksRepository::new(config.books_url())?))
    }
}
