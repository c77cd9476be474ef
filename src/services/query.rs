//! Query pipeline: filter, sort and paginate the cached records.
//!
//! Everything here is a pure function of its inputs.

use std::cmp::Ordering;

use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use crate::models::{Book, BookFilter, BookPage, SortDirection, SortField, SortState, PAGE_SIZE};

/// Run the whole pipeline and cut out the requested 1-based page
pub fn run<'a>(
    books: impl IntoIterator<Item = &'a Book>,
    filter: &BookFilter,
    sort: SortState,
    page: usize,
) -> BookPage {
    let mut matches = filtered(books, filter);
    sort_books(&mut matches, sort);

    let total = matches.len();
    let books = match page.checked_sub(1) {
        Some(index) => matches
            .into_iter()
            .skip(index.saturating_mul(PAGE_SIZE))
            .take(PAGE_SIZE)
            .collect(),
        None => Vec::new(),
    };

    BookPage {
        books,
        total,
        page,
        page_count: page_count(total),
    }
}

/// Records matching every active criterion, in input order
pub fn filtered<'a>(books: impl IntoIterator<Item = &'a Book>, filter: &BookFilter) -> Vec<Book> {
    books
        .into_iter()
        .filter(|b| filter.matches(b))
        .cloned()
        .collect()
}

/// Stable sort; equal keys keep their relative order in both directions
pub fn sort_books(books: &mut [Book], sort: SortState) {
    books.sort_by(|a, b| {
        let ord = match sort.field {
            SortField::Title => compare_titles(&a.title, &b.title),
            SortField::Year => a.year.cmp(&b.year),
        };
        match sort.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
}

/// Collation close to a locale compare: accents and case only decide
/// between otherwise equal titles.
pub fn compare_titles(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(collation_key(b))
        .then_with(|| a.cmp(b))
}

fn collation_key(s: &str) -> impl Iterator<Item = char> + '_ {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
}

pub fn page_count(total: usize) -> usize {
    total.div_ceil(PAGE_SIZE)
}

/// Choices offered by the genre and year filter controls
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOptions {
    /// Distinct non-empty genres, first-seen order
    pub genres: Vec<String>,
    /// Distinct years, ascending
    pub years: Vec<i32>,
}

pub fn filter_options<'a>(books: impl IntoIterator<Item = &'a Book>) -> FilterOptions {
    let mut options = FilterOptions::default();
    for book in books {
        if let Some(genre) = book.genre.as_deref().filter(|g| !g.is_empty()) {
            if !options.genres.iter().any(|g| g == genre) {
                options.genres.push(genre.to_string());
            }
        }
        options.years.push(book.year);
    }
    options.years.sort_unstable();
    options.years.dedup();
    options
}
