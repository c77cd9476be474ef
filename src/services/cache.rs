//! Local cache of book records, in server fetch order

use indexmap::IndexMap;

use crate::models::{Book, BookId};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookCache {
    books: IndexMap<BookId, Book>,
}

impl BookCache {
    pub fn new(books: Vec<Book>) -> Self {
        let mut cache = Self::default();
        cache.replace_all(books);
        cache
    }

    /// Bulk replace after a full refetch
    pub fn replace_all(&mut self, books: Vec<Book>) {
        self.books = books.into_iter().map(|b| (b.id.clone(), b)).collect();
    }

    /// Replace the entry with the same id in place, or append
    pub fn upsert(&mut self, book: Book) {
        self.books.insert(book.id.clone(), book);
    }

    /// Remove by id, keeping the order of the remaining entries
    pub fn remove(&mut self, id: &BookId) -> Option<Book> {
        self.books.shift_remove(id)
    }

    pub fn get(&self, id: &BookId) -> Option<&Book> {
        self.books.get(id)
    }

    pub fn contains(&self, id: &BookId) -> bool {
        self.books.contains_key(id)
    }

    /// Case-insensitive title lookup used by the create-time duplicate check
    pub fn has_title(&self, title: &str) -> bool {
        let wanted = title.to_lowercase();
        self.books.values().any(|b| b.title.to_lowercase() == wanted)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Book> {
        self.books.values()
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }
}
