//! Catalog services

pub mod cache;
pub mod catalog;
pub mod export;
pub mod query;
pub mod storage;

use std::sync::Arc;

use crate::{config::AppConfig, error::AppResult, repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
}

impl Services {
    /// Wire the backend and snapshot store selected by the configuration
    pub fn new(config: &AppConfig) -> AppResult<Self> {
        let store: Arc<dyn storage::KeyValueStore> = if config.storage.enabled {
            Arc::new(storage::FileStore::new(&config.storage.dir))
        } else {
            Arc::new(storage::MemoryStore::default())
        };
        let snapshot = config
            .storage
            .enabled
            .then(|| storage::Snapshot::new(store.clone()));

        let repository = repository::from_config(config, store)?;

        Ok(Self {
            catalog: catalog::CatalogService::new(repository, snapshot),
        })
    }
}
