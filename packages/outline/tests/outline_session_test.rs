//! Outline Session Integration Tests
//!
//! Exercises the public API end to end: an `Outline` writing through to the
//! JSON file backend, auto-saves, shutdown flushing, and reopening the same
//! directory.

#[cfg(test)]
mod outline_session_tests {
    use anyhow::Result;
    use nodespace_outline::{
        AutoSaveConfig, DataStore, JsonFileDataStore, NodeStoreError, Outline, OutlineConfig,
    };
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn fast_config() -> OutlineConfig {
        OutlineConfig {
            autosave: AutoSaveConfig { debounce_ms: 20 },
            ..Default::default()
        }
    }

    async fn open_file_outline(dir: &TempDir) -> Result<(Outline, Arc<JsonFileDataStore>)> {
        let backend = Arc::new(JsonFileDataStore::open(dir.path().join("outline")).await?);
        let outline = Outline::open(backend.clone(), fast_config()).await?;
        Ok((outline, backend))
    }

    #[tokio::test]
    async fn test_session_persists_across_reopen() -> Result<()> {
        let temp_dir = TempDir::new()?;

        let (project_id, task_id) = {
            let (outline, backend) = open_file_outline(&temp_dir).await?;
            let store = outline.store();

            let project = store.create("Q3 planning", Some("Project".to_string())).await?;
            let task = store.create_child(&project.id, "draft roadmap", None).await?;
            let note = store.create_child(&task.id, "ask design", None).await?;
            store.move_node(&note.id, Some(&project.id)).await?;

            assert_eq!(backend.list_nodes().await?.len(), 3);
            (project.id, task.id)
        };

        let (reopened, _backend) = open_file_outline(&temp_dir).await?;
        let store = reopened.store();

        let stats = reopened.stats().await;
        assert_eq!(stats.total_nodes, 3);
        assert_eq!(stats.root_count, 1);
        assert_eq!(stats.max_depth, 1);

        let children = store.children(&project_id).await;
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].id, task_id);
        assert!(store.verify_hierarchy().await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_autosave_writes_through_to_disk() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let (outline, backend) = open_file_outline(&temp_dir).await?;

        let node = outline.store().create("first draft", None).await?;
        let result = outline
            .autosave()
            .schedule(node.id.clone(), "second draft", None)
            .await
            .expect("save should run");
        assert!(result.success);

        let stored = backend.get_node(&node.id).await?.expect("record on disk");
        assert_eq!(stored.content, "second draft");
        assert_eq!(stored.metadata.version, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_shutdown_flushes_pending_saves() -> Result<()> {
        let config = OutlineConfig {
            autosave: AutoSaveConfig {
                debounce_ms: 60_000,
            },
            ..Default::default()
        };
        let outline = Outline::new(config)?;

        let first = outline.autosave().schedule("note-a", "alpha", None);
        let second = outline.autosave().schedule("note-b", "beta", None);
        assert_eq!(outline.stats().await.pending_auto_saves, 2);

        tokio::time::timeout(Duration::from_secs(5), outline.shutdown()).await?;

        assert_eq!(outline.stats().await.pending_auto_saves, 0);
        assert_eq!(first.await.and_then(|r| r.node).map(|n| n.content).as_deref(), Some("alpha"));
        assert_eq!(second.await.and_then(|r| r.node).map(|n| n.content).as_deref(), Some("beta"));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_during_pending_save_is_final() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let (outline, backend) = open_file_outline(&temp_dir).await?;
        let store = outline.store();

        let parent = store.create("parent", None).await?;
        let child = store.create_child(&parent.id, "child", None).await?;
        let handle = outline.autosave().schedule(child.id.clone(), "late edit", None);

        let deleted = store.delete(&parent.id).await?;
        assert!(deleted.existed);

        assert!(handle.await.is_none());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(backend.get_node(&child.id).await?.is_none());
        assert!(backend.list_nodes().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let config = OutlineConfig {
            default_title: String::new(),
            ..Default::default()
        };
        let err = Outline::new(config).unwrap_err();
        assert!(matches!(err, NodeStoreError::InvalidConfig(_)));
    }
}
