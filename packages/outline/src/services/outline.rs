//! Outline session
//!
//! Owns one [`NodeStore`] and the [`AutoSaveCoordinator`] that saves into it.
//! Construct one per open outline; nothing here is global.

use crate::config::OutlineConfig;
use crate::db::{DataStore, MemoryDataStore};
use crate::models::StoreStats;
use crate::services::autosave::AutoSaveCoordinator;
use crate::services::error::NodeStoreError;
use crate::services::node_store::NodeStore;
use std::sync::Arc;

#[derive(Debug)]
pub struct Outline {
    store: Arc<NodeStore>,
    autosave: AutoSaveCoordinator,
}

impl Outline {
    /// Start an empty in-memory session
    pub fn new(config: OutlineConfig) -> Result<Self, NodeStoreError> {
        Self::with_backend(Arc::new(MemoryDataStore::new()), config)
    }

    /// Start an empty session writing through to `backend`
    pub fn with_backend(
        backend: Arc<dyn DataStore>,
        config: OutlineConfig,
    ) -> Result<Self, NodeStoreError> {
        config.validate()?;
        Ok(Self::from_store(NodeStore::with_backend(backend, config)))
    }

    /// Resume a session from the records already in `backend`
    pub async fn open(
        backend: Arc<dyn DataStore>,
        config: OutlineConfig,
    ) -> Result<Self, NodeStoreError> {
        let store = NodeStore::open(backend, config).await?;
        Ok(Self::from_store(store))
    }

    fn from_store(store: NodeStore) -> Self {
        let store = Arc::new(store);
        let autosave = AutoSaveCoordinator::new(Arc::clone(&store));
        tracing::info!(
            "Outline session started (debounce {}ms)",
            autosave.delay().as_millis()
        );
        Self { store, autosave }
    }

    pub fn store(&self) -> &Arc<NodeStore> {
        &self.store
    }

    pub fn autosave(&self) -> &AutoSaveCoordinator {
        &self.autosave
    }

    pub async fn stats(&self) -> StoreStats {
        self.store.stats().await
    }

    /// Fire every pending save and wait until the registry drains
    ///
    /// Saves scheduled concurrently with shutdown are flushed as well.
    pub async fn shutdown(&self) {
        let pending = self.autosave.pending_count();
        self.autosave.drain().await;
        tracing::info!("Outline session closed ({} pending save(s) flushed)", pending);
    }
}
