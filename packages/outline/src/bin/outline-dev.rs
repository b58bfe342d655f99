//! Outline Development Binary
//!
//! Runs a short scripted outline session and prints the resulting hierarchy
//! and stats as JSON. Useful for eyeballing store behaviour and log output.
//!
//! # Usage
//!
//! ```bash
//! # In-memory session
//! cargo run --bin outline-dev
//!
//! # Persist records under a directory (reopened on the next run)
//! OUTLINE_DEV_DIR=/tmp/outline cargo run --bin outline-dev
//!
//! # Verbose store logging
//! RUST_LOG=nodespace_outline=debug cargo run --bin outline-dev
//! ```
//!
//! # Environment Variables
//!
//! - `OUTLINE_DEV_DIR`: directory for the JSON file backend (default: in-memory)
//! - `NODESPACE_DEFAULT_TITLE`, `NODESPACE_AUTOSAVE_DEBOUNCE_MS`: session config
//! - `RUST_LOG`: Logging level (e.g., "info", "debug", "trace")

use std::env;
use std::sync::Arc;

use nodespace_outline::{
    CreateNodeParams, DataStore, JsonFileDataStore, MemoryDataStore, NodeType, Outline,
    OutlineConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = OutlineConfig::from_env()?;
    tracing::info!("NodeSpace outline dev session");
    tracing::info!("Auto-save debounce: {}ms", config.autosave.debounce_ms);

    let backend: Arc<dyn DataStore> = match env::var("OUTLINE_DEV_DIR") {
        Ok(dir) => {
            tracing::info!("Storage: {}", dir);
            Arc::new(JsonFileDataStore::open(dir).await?)
        }
        Err(_) => {
            tracing::info!("Storage: in-memory");
            Arc::new(MemoryDataStore::new())
        }
    };

    let outline = Outline::open(backend, config).await?;
    let store = outline.store();

    let project = store
        .create("Plan the quarter", Some("Q3 Project".to_string()))
        .await?;
    let task = store
        .create_node(
            CreateNodeParams::text("Draft the roadmap")
                .with_type(NodeType::Task)
                .with_parent(project.id.clone()),
        )
        .await?;
    let notes = store
        .create_child(&task.id, "Ask design about timelines", None)
        .await?;

    // Promote the notes to sit beside the task
    store.move_node(&notes.id, Some(&project.id)).await?;
    store.toggle_expansion(&project.id).await?;

    let pending = outline.autosave().schedule(
        task.id.clone(),
        "Draft the roadmap and circulate it",
        None,
    );
    outline.shutdown().await;
    if let Some(result) = pending.await {
        tracing::info!("Auto-save finished (success: {})", result.success);
    }

    let hits = store.search("roadmap").await;
    tracing::info!("Search 'roadmap' matched {} node(s)", hits.len());

    let violations = store.verify_hierarchy().await;
    if !violations.is_empty() {
        anyhow::bail!("hierarchy violations: {:?}", violations);
    }

    println!("{}", serde_json::to_string_pretty(&store.build_hierarchy().await)?);
    println!("{}", serde_json::to_string_pretty(&outline.stats().await)?);

    Ok(())
}
