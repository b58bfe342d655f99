//! DataStore Trait - Persistence Abstraction
//!
//! The node store keeps the authoritative hierarchy in memory and writes every
//! committed change through to a `DataStore`, so an outline can outlive the
//! process when a durable backend is plugged in.
//!
//! Records are stored as JSON documents (`serde_json::Value`) keyed by node id.

use crate::db::StorageError;
use crate::models::Node;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Durable storage collaborator for node records
///
/// Implementations must be `Send + Sync`; the node store calls them while
/// holding its write lock, so calls are never interleaved for one store.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Fetch a record, `None` when absent
    async fn get_node(&self, id: &str) -> Result<Option<Node>, StorageError>;

    /// Insert or replace a record
    async fn put_node(&self, node: &Node) -> Result<(), StorageError>;

    /// Remove a record, returning whether it existed
    async fn delete_node(&self, id: &str) -> Result<bool, StorageError>;

    /// Every stored record, in no particular order (used for hydration)
    async fn list_nodes(&self) -> Result<Vec<Node>, StorageError>;

    /// Write `upserts` and remove `removals` as one unit
    ///
    /// Either every change lands or the backend is left as it was. The default
    /// implementation records each prior record with [`get_node`](Self::get_node)
    /// before overwriting it and restores those records, newest first, when a
    /// later write fails. Backends with native transactions should override it.
    async fn apply_batch(&self, upserts: &[Node], removals: &[String]) -> Result<(), StorageError> {
        let mut undo: Vec<(String, Option<Node>)> =
            Vec::with_capacity(upserts.len() + removals.len());

        let outcome = async {
            for node in upserts {
                let previous = self.get_node(&node.id).await?;
                self.put_node(node).await?;
                undo.push((node.id.clone(), previous));
            }
            for id in removals {
                let previous = self.get_node(id).await?;
                self.delete_node(id).await?;
                undo.push((id.clone(), previous));
            }
            Ok::<(), StorageError>(())
        }
        .await;

        if let Err(e) = outcome {
            tracing::warn!(
                "Batch write failed after {} record(s), rolling back: {}",
                undo.len(),
                e
            );
            for (id, previous) in undo.into_iter().rev() {
                let restored = match previous {
                    Some(node) => self.put_node(&node).await,
                    None => self.delete_node(&id).await.map(|_| ()),
                };
                if let Err(rollback) = restored {
                    tracing::warn!("Failed to restore record '{}': {}", id, rollback);
                }
            }
            return Err(e);
        }

        Ok(())
    }
}

/// In-process backend holding serialized records
///
/// Records live for the lifetime of the value. Clones share the same map.
#[derive(Clone, Default)]
pub struct MemoryDataStore {
    records: Arc<Mutex<HashMap<String, Value>>>,
}

impl MemoryDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate the store, e.g. to test hydration
    pub fn with_nodes(nodes: Vec<Node>) -> Result<Self, StorageError> {
        let mut records = HashMap::new();
        for node in nodes {
            records.insert(node.id.clone(), serde_json::to_value(&node)?);
        }

        Ok(Self {
            records: Arc::new(Mutex::new(records)),
        })
    }

    /// Number of stored records
    ///
    /// A poisoned lock is recovered: the map is only ever replaced entry by
    /// entry, so its contents stay readable.
    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Value>>, StorageError> {
        self.records.lock().map_err(|_| StorageError::LockPoisoned)
    }
}

#[async_trait]
impl DataStore for MemoryDataStore {
    async fn get_node(&self, id: &str) -> Result<Option<Node>, StorageError> {
        let records = self.lock()?;

        records
            .get(id)
            .map(|value| serde_json::from_value(value.clone()))
            .transpose()
            .map_err(StorageError::from)
    }

    async fn put_node(&self, node: &Node) -> Result<(), StorageError> {
        let value = serde_json::to_value(node)?;
        let mut records = self.lock()?;

        records.insert(node.id.clone(), value);
        Ok(())
    }

    async fn delete_node(&self, id: &str) -> Result<bool, StorageError> {
        let mut records = self.lock()?;

        Ok(records.remove(id).is_some())
    }

    async fn list_nodes(&self) -> Result<Vec<Node>, StorageError> {
        let records = self.lock()?;

        records
            .values()
            .map(|value| serde_json::from_value(value.clone()).map_err(StorageError::from))
            .collect()
    }

    /// Encodes every record first, then applies all changes under one lock
    async fn apply_batch(&self, upserts: &[Node], removals: &[String]) -> Result<(), StorageError> {
        let encoded = upserts
            .iter()
            .map(|node| Ok((node.id.clone(), serde_json::to_value(node)?)))
            .collect::<Result<Vec<_>, StorageError>>()?;

        let mut records = self.lock()?;
        records.extend(encoded);
        for id in removals {
            records.remove(id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NodeType;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Uses the default batch path and fails only the `fail_on`-th write
    struct FailNthWrite {
        inner: MemoryDataStore,
        writes: AtomicUsize,
        fail_on: usize,
    }

    impl FailNthWrite {
        fn new(inner: MemoryDataStore, fail_on: usize) -> Self {
            Self {
                inner,
                writes: AtomicUsize::new(0),
                fail_on,
            }
        }

        fn count_write(&self) -> Result<(), StorageError> {
            if self.writes.fetch_add(1, Ordering::SeqCst) + 1 == self.fail_on {
                Err(StorageError::backend("write rejected"))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl DataStore for FailNthWrite {
        async fn get_node(&self, id: &str) -> Result<Option<Node>, StorageError> {
            self.inner.get_node(id).await
        }

        async fn put_node(&self, node: &Node) -> Result<(), StorageError> {
            self.count_write()?;
            self.inner.put_node(node).await
        }

        async fn delete_node(&self, id: &str) -> Result<bool, StorageError> {
            self.count_write()?;
            self.inner.delete_node(id).await
        }

        async fn list_nodes(&self) -> Result<Vec<Node>, StorageError> {
            self.inner.list_nodes().await
        }
    }

    fn create_test_node(id: &str, content: &str) -> Node {
        Node::new_root(
            id.to_string(),
            NodeType::Text,
            content.to_string(),
            "Untitled".to_string(),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_memory_store_creation() {
        let store = MemoryDataStore::new();
        assert!(store.is_empty());
        assert!(store.list_nodes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_put_and_get_node() {
        let store = MemoryDataStore::new();
        let node = create_test_node("a", "Test content");

        store.put_node(&node).await.unwrap();

        let retrieved = store.get_node("a").await.unwrap();
        assert_eq!(retrieved, Some(node));
    }

    #[tokio::test]
    async fn test_get_nonexistent_node() {
        let store = MemoryDataStore::new();
        assert!(store.get_node("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_replaces_existing_record() {
        let store = MemoryDataStore::new();
        let mut node = create_test_node("a", "Original content");
        store.put_node(&node).await.unwrap();

        node.content = "Updated content".to_string();
        store.put_node(&node).await.unwrap();

        let retrieved = store.get_node("a").await.unwrap().unwrap();
        assert_eq!(retrieved.content, "Updated content");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_node() {
        let store = MemoryDataStore::new();
        store.put_node(&create_test_node("a", "x")).await.unwrap();

        assert!(store.delete_node("a").await.unwrap());
        assert!(!store.delete_node("a").await.unwrap());
        assert!(store.get_node("a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_with_nodes_and_shared_clones() {
        let store =
            MemoryDataStore::with_nodes(vec![create_test_node("a", "1"), create_test_node("b", "2")])
                .unwrap();
        let clone = store.clone();

        clone.put_node(&create_test_node("c", "3")).await.unwrap();

        let mut ids: Vec<String> = store
            .list_nodes()
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_apply_batch_writes_and_removes() {
        let store = MemoryDataStore::with_nodes(vec![create_test_node("old", "x")]).unwrap();

        store
            .apply_batch(
                &[create_test_node("a", "1"), create_test_node("b", "2")],
                &["old".to_string()],
            )
            .await
            .unwrap();

        assert_eq!(store.len(), 2);
        assert!(store.get_node("old").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_default_apply_batch_rolls_back_on_failure() {
        let original_a = create_test_node("a", "original a");
        let doomed = create_test_node("doomed", "to be removed");
        let inner =
            MemoryDataStore::with_nodes(vec![original_a.clone(), doomed.clone()]).unwrap();
        // Writes: put a, put b, delete doomed (fails)
        let backend = FailNthWrite::new(inner.clone(), 3);

        let mut changed_a = original_a.clone();
        changed_a.content = "changed".to_string();
        let result = backend
            .apply_batch(
                &[changed_a, create_test_node("b", "new")],
                &["doomed".to_string()],
            )
            .await;

        assert!(matches!(result, Err(StorageError::Backend(_))));
        assert_eq!(inner.get_node("a").await.unwrap(), Some(original_a));
        assert!(inner.get_node("b").await.unwrap().is_none());
        assert_eq!(inner.get_node("doomed").await.unwrap(), Some(doomed));
        assert_eq!(inner.len(), 2);
    }

    #[tokio::test]
    async fn test_len_survives_poisoned_lock() {
        let store = MemoryDataStore::with_nodes(vec![create_test_node("a", "1")]).unwrap();
        let clone = store.clone();

        let _ = std::thread::spawn(move || {
            let _guard = clone.records.lock().unwrap();
            panic!("writer panicked while holding the lock");
        })
        .join();

        assert_eq!(store.len(), 1);
        assert!(!store.is_empty());
        assert!(matches!(
            store.get_node("a").await,
            Err(StorageError::LockPoisoned)
        ));
    }
}
