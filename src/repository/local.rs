//! Fallback backend served from the local snapshot.
//!
//! Mirrors the server's rules (exact-title uniqueness, loan state checks) and
//! assigns time-derived identifiers.

use async_trait::async_trait;
use chrono::Utc;
use indexmap::IndexMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::{
    error::{AppError, AppResult},
    models::{Book, BookId, BookPayload},
    services::storage::{KeyValueStore, Snapshot},
};

use super::{BooksRepository, LoanAction};

pub struct LocalBooksRepository {
    books: Mutex<IndexMap<BookId, Book>>,
    snapshot: Snapshot,
}

impl LocalBooksRepository {
    /// Open over a store; an unreadable snapshot starts an empty catalog
    pub fn open(store: Arc<dyn KeyValueStore>) -> Self {
        let snapshot = Snapshot::new(store);
        let books = match snapshot.load_books() {
            Ok(Some(books)) => books,
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!("Ignoring unreadable local snapshot: {}", e);
                Vec::new()
            }
        };
        tracing::debug!("Local backend opened with {} books", books.len());

        Self {
            books: Mutex::new(books.into_iter().map(|b| (b.id.clone(), b)).collect()),
            snapshot,
        }
    }

    /// Apply `change` to a copy, persist it, then commit
    async fn mutate<T>(
        &self,
        change: impl FnOnce(&mut IndexMap<BookId, Book>) -> AppResult<T>,
    ) -> AppResult<T> {
        let mut books = self.books.lock().await;
        let mut next = books.clone();
        let result = change(&mut next)?;
        self.snapshot.save_books(next.values())?;
        *books = next;
        Ok(result)
    }
}

/// Identifier derived from the current time, bumped past any collision
fn synthetic_id(books: &IndexMap<BookId, Book>) -> BookId {
    let mut millis = Utc::now().timestamp_millis();
    while books.contains_key(&BookId::from(millis)) {
        millis += 1;
    }
    BookId::from(millis)
}

fn not_found(id: &BookId) -> AppError {
    AppError::NotFound(format!("Book {} not found", id))
}

#[async_trait]
impl BooksRepository for LocalBooksRepository {
    async fn list(&self) -> AppResult<Vec<Book>> {
        Ok(self.books.lock().await.values().cloned().collect())
    }

    async fn create(&self, payload: &BookPayload) -> AppResult<Option<Book>> {
        let payload = payload.clone();
        self.mutate(|books| {
            if books.values().any(|b| b.title == payload.title) {
                return Err(AppError::Conflict(
                    "A book with this title already exists".to_string(),
                ));
            }
            let book = Book::from_payload(synthetic_id(books), payload);
            books.insert(book.id.clone(), book.clone());
            Ok(Some(book))
        })
        .await
    }

    async fn update(&self, id: &BookId, payload: &BookPayload) -> AppResult<Option<Book>> {
        let payload = payload.clone();
        self.mutate(|books| {
            let slot = books.get_mut(id).ok_or_else(|| not_found(id))?;
            *slot = Book::from_payload(id.clone(), payload);
            Ok(Some(slot.clone()))
        })
        .await
    }

    async fn delete(&self, id: &BookId) -> AppResult<()> {
        self.mutate(|books| {
            books.shift_remove(id).map(|_| ()).ok_or_else(|| not_found(id))
        })
        .await
    }

    async fn set_loan(&self, id: &BookId, action: LoanAction) -> AppResult<Option<Book>> {
        self.mutate(|books| {
            let book = books.get_mut(id).ok_or_else(|| not_found(id))?;
            match (action, book.is_on_loan()) {
                (LoanAction::Lend, true) => {
                    Err(AppError::Conflict("Book is already on loan".to_string()))
                }
                (LoanAction::Return, false) => {
                    Err(AppError::Conflict("Book is already available".to_string()))
                }
                (LoanAction::Lend, false) => {
                    book.lend(Utc::now());
                    Ok(Some(book.clone()))
                }
                (LoanAction::Return, true) => {
                    book.give_back();
                    Ok(Some(book.clone()))
                }
            }
        })
        .await
    }
}
