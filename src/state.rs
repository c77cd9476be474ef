//! Catalog working state: cached records plus the current view settings

use crate::{
    models::{Book, BookFilter, BookPage, SortState},
    services::{cache::BookCache, query},
};

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogState {
    pub cache: BookCache,
    pub filter: BookFilter,
    pub sort: SortState,
    /// Current 1-based page
    pub page: usize,
}

impl Default for CatalogState {
    fn default() -> Self {
        Self {
            cache: BookCache::default(),
            filter: BookFilter::default(),
            sort: SortState::default(),
            page: 1,
        }
    }
}

impl CatalogState {
    /// Replace the filter; the view goes back to the first page
    pub fn set_filter(&mut self, filter: BookFilter) {
        self.filter = filter;
        self.page = 1;
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page;
    }

    /// Page currently selected by the view settings
    pub fn current_page(&self) -> BookPage {
        query::run(self.cache.iter(), &self.filter, self.sort, self.page)
    }

    /// Filtered set in cache order, as exported
    pub fn filtered(&self) -> Vec<Book> {
        query::filtered(self.cache.iter(), &self.filter)
    }
}
