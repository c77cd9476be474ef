//! Livros catalog client
//!
//! Client-side catalog manager for a book-lending REST API: lists, filters,
//! sorts and paginates book records, creates, edits and deletes them, and
//! toggles their loan status. Runs against the backend or, offline, against a
//! local snapshot.

pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;
pub mod state;
pub mod view;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use state::CatalogState;
