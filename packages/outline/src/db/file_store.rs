//! File-backed DataStore
//!
//! Stores each node as `<dir>/<id>.json`. Writes go to a temporary sibling
//! file first and are renamed into place, so a crash mid-write never leaves a
//! truncated record behind.

use crate::db::{DataStore, StorageError};
use crate::models::Node;
use crate::utils::is_valid_node_id;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const RECORD_EXTENSION: &str = "json";

/// Directory of JSON node records
#[derive(Debug, Clone)]
pub struct JsonFileDataStore {
    dir: PathBuf,
}

impl JsonFileDataStore {
    /// Open (and create if needed) a record directory
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StorageError::io(&dir, e))?;

        tracing::info!("Opened node record directory at {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: &str) -> Result<PathBuf, StorageError> {
        // Ids become file names; reject anything that could escape the directory
        if !is_valid_node_id(id) {
            return Err(StorageError::backend(format!(
                "Node id '{}' is not a valid record name",
                id
            )));
        }
        Ok(self.dir.join(format!("{}.{}", id, RECORD_EXTENSION)))
    }
}

#[async_trait]
impl DataStore for JsonFileDataStore {
    async fn get_node(&self, id: &str) -> Result<Option<Node>, StorageError> {
        let path = self.record_path(id)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io(path, e)),
        }
    }

    async fn put_node(&self, node: &Node) -> Result<(), StorageError> {
        let path = self.record_path(&node.id)?;
        let tmp_path = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(node)?;

        tokio::fs::write(&tmp_path, bytes)
            .await
            .map_err(|e| StorageError::io(&tmp_path, e))?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| StorageError::io(&path, e))?;

        Ok(())
    }

    async fn delete_node(&self, id: &str) -> Result<bool, StorageError> {
        let path = self.record_path(id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::io(path, e)),
        }
    }

    async fn list_nodes(&self) -> Result<Vec<Node>, StorageError> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| StorageError::io(&self.dir, e))?;

        let mut nodes = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::io(&self.dir, e))?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }

            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|e| StorageError::io(&path, e))?;
            nodes.push(serde_json::from_slice(&bytes)?);
        }

        Ok(nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NodeType;
    use chrono::Utc;
    use tempfile::TempDir;

    fn create_test_node(id: &str) -> Node {
        Node::new_root(
            id.to_string(),
            NodeType::Text,
            format!("Content of {}", id),
            "Untitled".to_string(),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_put_get_delete_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileDataStore::open(temp_dir.path().join("nodes"))
            .await
            .unwrap();
        let node = create_test_node("alpha");

        store.put_node(&node).await.unwrap();
        assert!(store.dir().join("alpha.json").exists());
        assert!(!store.dir().join("alpha.json.tmp").exists());

        assert_eq!(store.get_node("alpha").await.unwrap(), Some(node));
        assert!(store.delete_node("alpha").await.unwrap());
        assert!(!store.delete_node("alpha").await.unwrap());
        assert!(store.get_node("alpha").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_skips_foreign_files() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileDataStore::open(temp_dir.path()).await.unwrap();

        store.put_node(&create_test_node("a")).await.unwrap();
        store.put_node(&create_test_node("b")).await.unwrap();
        std::fs::write(temp_dir.path().join("notes.txt"), "ignore me").unwrap();

        let mut ids: Vec<String> = store
            .list_nodes()
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_rejects_path_like_ids() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileDataStore::open(temp_dir.path()).await.unwrap();

        let result = store.get_node("../escape").await;
        assert!(matches!(result, Err(StorageError::Backend(_))));
    }

    #[tokio::test]
    async fn test_corrupt_record_is_a_serialization_error() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileDataStore::open(temp_dir.path()).await.unwrap();
        std::fs::write(temp_dir.path().join("broken.json"), "{ not json").unwrap();

        let result = store.get_node("broken").await;
        assert!(matches!(result, Err(StorageError::Serialization(_))));
    }
}
