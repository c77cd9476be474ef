//! Key-value snapshot store for session continuity and offline mode

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::{
    error::{AppError, AppResult},
    models::{Book, SortState},
};

/// Key holding the serialized record collection
pub const BOOKS_KEY: &str = "livros";
/// Key holding the serialized sort state
pub const SORT_KEY: &str = "ordenacao";

/// Minimal string key-value store
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> AppResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> AppResult<()>;
}

/// One `<key>.json` file per key under a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        match fs::read_to_string(self.path(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        fs::create_dir_all(&self.dir)?;
        // readers never observe a partially written entry
        let tmp = self.dir.join(format!(".{}.json.tmp", key));
        fs::write(&tmp, value)?;
        fs::rename(&tmp, self.path(key))?;
        Ok(())
    }
}

/// In-process store, used when persistence is disabled and in tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| AppError::Storage("Memory store lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| AppError::Storage("Memory store lock poisoned".to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Typed access to the two snapshot entries
#[derive(Clone)]
pub struct Snapshot {
    store: Arc<dyn KeyValueStore>,
}

impl Snapshot {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn load_books(&self) -> AppResult<Option<Vec<Book>>> {
        match self.store.get(BOOKS_KEY)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn save_books<'a>(&self, books: impl IntoIterator<Item = &'a Book>) -> AppResult<()> {
        let books: Vec<&Book> = books.into_iter().collect();
        self.store.set(BOOKS_KEY, &serde_json::to_string(&books)?)
    }

    pub fn load_sort(&self) -> AppResult<Option<SortState>> {
        match self.store.get(SORT_KEY)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn save_sort(&self, sort: &SortState) -> AppResult<()> {
        self.store.set(SORT_KEY, &serde_json::to_string(sort)?)
    }
}
