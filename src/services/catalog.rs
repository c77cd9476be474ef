//! Catalog mutation service.
//!
//! Validates user input, forwards mutations to the repository and reconciles
//! the local cache with what the backend answered. A failed call leaves the
//! state exactly as it was.

use chrono::Utc;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{current_year, Book, BookId, BookInput, SortState},
    repository::{BooksRepository, LoanAction},
    services::storage::Snapshot,
    state::CatalogState,
};

/// Result of a mutation that did not fail
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// Backend confirmed; the cache holds the echoed record
    Applied(T),
    /// Backend confirmed without echoing the record; the cache was reloaded
    Reloaded,
    /// The confirmation gate said no; nothing was sent
    Declined,
    /// The identifier is not in the cache; nothing was sent
    Stale,
}

/// Yes/no gate asked before destructive actions
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F: Fn(&str) -> bool> Confirm for F {
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

#[derive(Clone)]
pub struct CatalogService {
    repository: Arc<dyn BooksRepository>,
    snapshot: Option<Snapshot>,
}

impl CatalogService {
    pub fn new(repository: Arc<dyn BooksRepository>, snapshot: Option<Snapshot>) -> Self {
        Self {
            repository,
            snapshot,
        }
    }

    /// Build the initial state. Neither a missing snapshot nor an unreachable
    /// backend is fatal: the latter yields an empty working set.
    pub async fn init(&self) -> CatalogState {
        let mut state = CatalogState::default();

        if let Some(snapshot) = &self.snapshot {
            match snapshot.load_sort() {
                Ok(Some(sort)) => state.sort = sort,
                Ok(None) => {}
                Err(e) => tracing::warn!("Ignoring saved sort state: {}", e),
            }
        }

        match self.repository.list().await {
            Ok(books) => {
                tracing::info!("Loaded {} books", books.len());
                state.cache.replace_all(books);
                self.mirror(&state);
            }
            Err(e) => tracing::warn!("Could not load the catalog, starting empty: {}", e),
        }

        state
    }

    /// Reload the whole collection from the backend
    pub async fn refresh(&self, state: &mut CatalogState) -> AppResult<()> {
        let books = self.repository.list().await?;
        tracing::debug!("Refreshed cache with {} books", books.len());
        state.cache.replace_all(books);
        self.mirror(state);
        Ok(())
    }

    /// Create a book. Title uniqueness is checked against the cache here only.
    pub async fn create(&self, state: &mut CatalogState, input: BookInput) -> AppResult<Outcome<Book>> {
        let input = input.normalized();
        input.check(current_year())?;
        if state.cache.has_title(&input.title) {
            return Err(AppError::Validation(
                "A book with this title already exists".to_string(),
            ));
        }

        let payload = input.into_payload(None, Utc::now());
        match self.repository.create(&payload).await? {
            Some(book) => {
                tracing::info!("Created book {} ({})", book.id, book.title);
                state.cache.upsert(book.clone());
                self.mirror(state);
                Ok(Outcome::Applied(book))
            }
            None => {
                self.refresh(state).await?;
                Ok(Outcome::Reloaded)
            }
        }
    }

    /// Edit a book. No duplicate-title check in this flow.
    pub async fn edit(
        &self,
        state: &mut CatalogState,
        id: &BookId,
        input: BookInput,
    ) -> AppResult<Outcome<Book>> {
        let Some(current) = state.cache.get(id).cloned() else {
            tracing::debug!("Edit of unknown book {} ignored", id);
            return Ok(Outcome::Stale);
        };

        let input = input.normalized();
        input.check(current_year())?;

        let payload = input.into_payload(Some(&current), Utc::now());
        match self.repository.update(id, &payload).await? {
            Some(book) => {
                tracing::info!("Updated book {}", book.id);
                state.cache.upsert(book.clone());
                self.mirror(state);
                Ok(Outcome::Applied(book))
            }
            None => {
                self.refresh(state).await?;
                Ok(Outcome::Reloaded)
            }
        }
    }

    /// Delete a book once `confirm` agrees, then reload the collection
    pub async fn delete(
        &self,
        state: &mut CatalogState,
        id: &BookId,
        confirm: &dyn Confirm,
    ) -> AppResult<Outcome<()>> {
        let Some(book) = state.cache.get(id) else {
            tracing::debug!("Delete of unknown book {} ignored", id);
            return Ok(Outcome::Stale);
        };

        if !confirm.confirm(&format!("Delete \"{}\"?", book.title)) {
            return Ok(Outcome::Declined);
        }

        self.repository.delete(id).await?;
        tracing::info!("Deleted book {}", id);

        if let Err(e) = self.refresh(state).await {
            tracing::warn!("Reload after delete failed, dropping {} locally: {}", id, e);
            state.cache.remove(id);
            self.mirror(state);
        }
        Ok(Outcome::Applied(()))
    }

    /// Lend an available book, or take back one that is on loan
    pub async fn toggle_loan(&self, state: &mut CatalogState, id: &BookId) -> AppResult<Outcome<Book>> {
        let Some(book) = state.cache.get(id) else {
            tracing::debug!("Loan toggle of unknown book {} ignored", id);
            return Ok(Outcome::Stale);
        };

        let action = LoanAction::toggling(book);
        match self.repository.set_loan(id, action).await? {
            Some(book) => {
                tracing::info!("Book {} is now {}", book.id, book.status.label());
                state.cache.upsert(book.clone());
                self.mirror(state);
                Ok(Outcome::Applied(book))
            }
            None => {
                self.refresh(state).await?;
                Ok(Outcome::Reloaded)
            }
        }
    }

    /// Change sort order and remember it for the next session
    pub fn set_sort(&self, state: &mut CatalogState, sort: SortState) {
        state.sort = sort;
        if let Some(snapshot) = &self.snapshot {
            if let Err(e) = snapshot.save_sort(&sort) {
                tracing::warn!("Could not save sort state: {}", e);
            }
        }
    }

    fn mirror(&self, state: &CatalogState) {
        if let Some(snapshot) = &self.snapshot {
            if let Err(e) = snapshot.save_books(state.cache.iter()) {
                tracing::warn!("Could not save catalog snapshot: {}", e);
            }
        }
    }
}
