//! Node Store - Hierarchy and CRUD
//!
//! This module provides the canonical in-memory node hierarchy:
//!
//! - CRUD operations (create, create_child, save, load, delete)
//! - Hierarchy management (move_node, toggle_expansion, children, build_hierarchy)
//! - Queries (list_all, search, stats)
//!
//! # Consistency
//!
//! Every mutation runs under the store-wide write lock and is expressed as a
//! changeset: the affected records are cloned, updated, written through to the
//! [`DataStore`], and only then applied in memory. Validation happens before
//! anything is staged, so a rejected or failed operation leaves the store
//! untouched. The invariants checked by [`check_invariants`] hold after every
//! operation.
//!
//! # Deletion Policy
//!
//! Deleting a node removes its entire subtree. Pending auto-saves of every
//! removed node are cancelled before the write lock is released, so a timer
//! that fires afterwards cannot resurrect a deleted node.

use crate::config::OutlineConfig;
use crate::db::{DataStore, DomainEvent, MemoryDataStore, StorageError};
use crate::models::{
    CreateNodeParams, DeleteResult, Node, NodeTree, NodeType, SaveResult, StoreStats,
};
use crate::services::error::NodeStoreError;
use crate::services::hierarchy::{self, check_invariants, HierarchyViolation, NodeMap};
use crate::services::pending_saves::PendingSaves;
use crate::utils::is_valid_node_id;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

/// Records to write and remove as one unit
#[derive(Default)]
struct Changeset {
    upserts: Vec<Node>,
    removals: Vec<String>,
}

impl Changeset {
    fn upsert(node: Node) -> Self {
        Self {
            upserts: vec![node],
            removals: Vec::new(),
        }
    }
}

#[derive(Default)]
struct StoreState {
    nodes: NodeMap,
    last_tick: Option<DateTime<Utc>>,
}

impl StoreState {
    /// Strictly increasing timestamp for the next mutation
    fn tick(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let next = match self.last_tick {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_tick = Some(next);
        next
    }

    fn apply(&mut self, changes: Changeset) {
        for node in changes.upserts {
            self.nodes.insert(node.id.clone(), node);
        }
        for id in changes.removals {
            self.nodes.remove(&id);
        }
    }

    fn require(&self, id: &str) -> Result<&Node, NodeStoreError> {
        self.nodes
            .get(id)
            .ok_or_else(|| NodeStoreError::node_not_found(id))
    }
}

/// Canonical owner of all node records for one outline session
pub struct NodeStore {
    state: RwLock<StoreState>,
    backend: Arc<dyn DataStore>,
    pending: Arc<PendingSaves>,
    event_tx: broadcast::Sender<DomainEvent>,
    config: OutlineConfig,
}

impl NodeStore {
    /// Create an empty store backed by a [`MemoryDataStore`]
    pub fn new(config: OutlineConfig) -> Self {
        Self::with_backend(Arc::new(MemoryDataStore::new()), config)
    }

    /// Create an empty store writing through to `backend`
    ///
    /// Existing records in the backend are not loaded; use [`open`](Self::open)
    /// to resume a persisted outline.
    pub fn with_backend(backend: Arc<dyn DataStore>, config: OutlineConfig) -> Self {
        Self::from_parts(backend, config, NodeMap::new())
    }

    /// Hydrate a store from every record in `backend`
    ///
    /// # Errors
    ///
    /// - `InvalidConfig` if the configuration does not validate
    /// - `Storage` if the backend cannot be listed
    /// - `CorruptHierarchy` if the records break any tree invariant
    pub async fn open(
        backend: Arc<dyn DataStore>,
        config: OutlineConfig,
    ) -> Result<Self, NodeStoreError> {
        config.validate()?;

        let records = backend.list_nodes().await?;
        let nodes: NodeMap = records
            .into_iter()
            .map(|node| (node.id.clone(), node))
            .collect();

        let violations = check_invariants(&nodes);
        if !violations.is_empty() {
            for violation in &violations {
                tracing::warn!("Hierarchy violation in stored records: {}", violation);
            }
            return Err(NodeStoreError::CorruptHierarchy(format!(
                "{} violation(s), first: {}",
                violations.len(),
                violations[0]
            )));
        }

        tracing::info!("Hydrated node store with {} node(s)", nodes.len());
        Ok(Self::from_parts(backend, config, nodes))
    }

    fn from_parts(backend: Arc<dyn DataStore>, config: OutlineConfig, nodes: NodeMap) -> Self {
        let (event_tx, _) = broadcast::channel(config.event_channel_capacity.max(1));
        let last_tick = nodes.values().map(|node| node.updated_at).max();

        Self {
            state: RwLock::new(StoreState { nodes, last_tick }),
            backend,
            pending: Arc::new(PendingSaves::new()),
            event_tx,
            config,
        }
    }

    pub fn config(&self) -> &OutlineConfig {
        &self.config
    }

    /// Registry of pending auto-saves shared with the coordinator
    pub fn pending_saves(&self) -> &Arc<PendingSaves> {
        &self.pending
    }

    /// Subscribe to domain events emitted after each committed operation
    pub fn subscribe_to_events(&self) -> broadcast::Receiver<DomainEvent> {
        self.event_tx.subscribe()
    }

    fn emit_event(&self, event: DomainEvent) {
        tracing::trace!("Emitting {} for node '{}'", event.event_type(), event.node_id());
        let _ = self.event_tx.send(event);
    }

    fn default_title(&self, node_type: NodeType) -> String {
        node_type.default_title(&self.config.default_title).to_string()
    }

    /// Persist a changeset as one batch, then apply it in memory
    ///
    /// A backend failure returns before anything is applied, and the batch
    /// leaves the backend without a partial changeset.
    async fn commit(&self, state: &mut StoreState, changes: Changeset) -> Result<(), StorageError> {
        self.backend
            .apply_batch(&changes.upserts, &changes.removals)
            .await?;
        state.apply(changes);
        Ok(())
    }

    //
    // CREATE
    //

    /// Create a root text node
    pub async fn create(
        &self,
        content: impl Into<String>,
        title: Option<String>,
    ) -> Result<Node, NodeStoreError> {
        self.create_node(CreateNodeParams {
            content: content.into(),
            title,
            ..Default::default()
        })
        .await
    }

    /// Create a text node under `parent_id`
    ///
    /// # Errors
    ///
    /// `InvalidParent` if `parent_id` does not resolve.
    pub async fn create_child(
        &self,
        parent_id: &str,
        content: impl Into<String>,
        title: Option<String>,
    ) -> Result<Node, NodeStoreError> {
        self.create_node(CreateNodeParams {
            content: content.into(),
            title,
            parent_id: Some(parent_id.to_string()),
            ..Default::default()
        })
        .await
    }

    /// Create a node with a generated UUID
    ///
    /// For child nodes the parent is updated in the same changeset: its
    /// `children_ids` gains the new id, `has_children` becomes true and its
    /// `updated_at` is refreshed. Either both records are stored or neither.
    pub async fn create_node(&self, params: CreateNodeParams) -> Result<Node, NodeStoreError> {
        let mut state = self.state.write().await;

        let id = Uuid::new_v4().to_string();
        let title = params
            .title
            .unwrap_or_else(|| self.default_title(params.node_type));
        let mut changes = Changeset::default();

        let node = match params.parent_id.as_deref() {
            None => {
                let now = state.tick();
                Node::new_root(id, params.node_type, params.content, title, now)
            }
            Some(parent_id) => {
                let mut parent = match state.nodes.get(parent_id) {
                    Some(parent) => parent.clone(),
                    None => {
                        tracing::warn!("Rejected child creation: parent '{}' not found", parent_id);
                        return Err(NodeStoreError::invalid_parent(parent_id));
                    }
                };
                let now = state.tick();
                let node =
                    Node::new_child(id, params.node_type, params.content, title, &parent, now);
                parent.attach_child(&node.id, now);
                changes.upserts.push(parent);
                node
            }
        };

        changes.upserts.push(node.clone());
        self.commit(&mut state, changes).await?;

        tracing::debug!(
            "Created node '{}' (parent: {:?}, depth: {})",
            node.id,
            node.parent_id,
            node.depth
        );
        self.emit_event(DomainEvent::NodeCreated(node.clone()));
        Ok(node)
    }

    //
    // SAVE
    //

    /// Save content (and optionally a title) for `id`
    ///
    /// Upsert semantics: an unknown id creates a root text node with that id
    /// and version 1. For an existing node the word count is recomputed, the
    /// version incremented and `updated_at` refreshed; an omitted title keeps
    /// the current one.
    ///
    /// Never fails with `Err`: an invalid id or a backend failure is reported
    /// through [`SaveResult::error`] and leaves the node unchanged.
    pub async fn save(
        &self,
        id: &str,
        content: impl Into<String>,
        title: Option<String>,
    ) -> SaveResult {
        let mut state = self.state.write().await;
        self.save_locked(&mut state, id, content.into(), title).await
    }

    /// Save on behalf of a pending auto-save
    ///
    /// Once the write lock is held the slot is marked in flight. A save whose
    /// slot was cancelled, superseded or removed by a delete that committed
    /// first returns `None` and touches nothing.
    pub(crate) async fn save_scheduled(
        &self,
        id: &str,
        content: String,
        title: Option<String>,
        ticket: u64,
    ) -> Option<SaveResult> {
        let mut state = self.state.write().await;
        if !self.pending.begin_save(id, ticket) {
            return None;
        }
        Some(self.save_locked(&mut state, id, content, title).await)
    }

    async fn save_locked(
        &self,
        state: &mut StoreState,
        id: &str,
        content: String,
        title: Option<String>,
    ) -> SaveResult {
        if !is_valid_node_id(id) {
            tracing::warn!("Rejected save for invalid node id '{}'", id);
            return SaveResult::failed(NodeStoreError::InvalidNodeId(id.to_string()).to_string());
        }

        let now = state.tick();
        let (node, created) = match state.nodes.get(id) {
            Some(existing) => {
                let mut node = existing.clone();
                let title = title.unwrap_or_else(|| node.title.clone());
                node.apply_save(content, title, now);
                (node, false)
            }
            None => {
                let title = title.unwrap_or_else(|| self.default_title(NodeType::Text));
                let node = Node::new_root(id.to_string(), NodeType::Text, content, title, now);
                (node, true)
            }
        };

        if let Err(e) = self.commit(state, Changeset::upsert(node.clone())).await {
            tracing::warn!("Save failed for node '{}': {}", id, e);
            return SaveResult::failed(NodeStoreError::from(e).to_string());
        }

        tracing::debug!(
            "Saved node '{}' (version {}, {} words{})",
            id,
            node.metadata.version,
            node.metadata.word_count,
            if created { ", created" } else { "" }
        );

        if created {
            self.emit_event(DomainEvent::NodeCreated(node.clone()));
        } else {
            self.emit_event(DomainEvent::NodeUpdated(node.clone()));
        }
        SaveResult::saved(node)
    }

    //
    // READ
    //

    /// Look up a node; no side effects
    pub async fn load(&self, id: &str) -> Option<Node> {
        self.state.read().await.nodes.get(id).cloned()
    }

    /// Direct children of `parent_id`, oldest first
    ///
    /// Empty when the parent is absent or childless.
    pub async fn children(&self, parent_id: &str) -> Vec<Node> {
        let state = self.state.read().await;
        hierarchy::sorted_children(&state.nodes, parent_id)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Parent chain of `id`, nearest ancestor first
    pub async fn ancestors(&self, id: &str) -> Vec<Node> {
        let state = self.state.read().await;
        let mut ancestors = Vec::new();
        let mut current = state.nodes.get(id).and_then(|n| n.parent_id.as_deref());

        while let Some(parent_id) = current {
            let Some(parent) = state.nodes.get(parent_id) else {
                break;
            };
            if ancestors.len() >= state.nodes.len() {
                break;
            }
            ancestors.push(parent.clone());
            current = parent.parent_id.as_deref();
        }

        ancestors
    }

    /// Every descendant of `id` in breadth-first order, excluding `id`
    pub async fn descendants(&self, id: &str) -> Vec<Node> {
        let state = self.state.read().await;
        hierarchy::collect_subtree(&state.nodes, id)
            .into_iter()
            .skip(1)
            .filter_map(|descendant| state.nodes.get(&descendant).cloned())
            .collect()
    }

    /// All nodes, most recently updated first
    pub async fn list_all(&self) -> Vec<Node> {
        let state = self.state.read().await;
        let mut nodes: Vec<Node> = state.nodes.values().cloned().collect();
        sort_by_recent_update(&mut nodes);
        nodes
    }

    /// Case-insensitive substring search over title and content
    ///
    /// A blank query returns [`list_all`](Self::list_all). Results are most
    /// recently updated first.
    pub async fn search(&self, query: &str) -> Vec<Node> {
        let query = query.trim();
        if query.is_empty() {
            return self.list_all().await;
        }

        let needle = query.to_lowercase();
        let state = self.state.read().await;
        let mut matches: Vec<Node> = state
            .nodes
            .values()
            .filter(|node| {
                node.title.to_lowercase().contains(&needle)
                    || node.content.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect();
        sort_by_recent_update(&mut matches);

        tracing::debug!("Search '{}' matched {} node(s)", query, matches.len());
        matches
    }

    /// Nested snapshot of every root and its descendants
    ///
    /// Roots and each level of children are ordered by creation time. The
    /// result is a copy; later mutations do not affect it.
    pub async fn build_hierarchy(&self) -> Vec<NodeTree> {
        let state = self.state.read().await;
        let roots = hierarchy::sorted_roots(&state.nodes);
        hierarchy::build_forest(&state.nodes, &roots)
    }

    /// Nested snapshot rooted at `id`
    pub async fn build_subtree(&self, id: &str) -> Option<NodeTree> {
        let state = self.state.read().await;
        let root = state.nodes.get(id)?;
        hierarchy::build_forest(&state.nodes, &[root]).pop()
    }

    /// Aggregate counters over the current state, O(n)
    pub async fn stats(&self) -> StoreStats {
        let state = self.state.read().await;
        let nodes = state.nodes.values();

        let mut stats = StoreStats {
            total_nodes: state.nodes.len(),
            pending_auto_saves: self.pending.len(),
            ..Default::default()
        };

        for node in nodes {
            if node.is_root() {
                stats.root_count += 1;
            }
            if node.has_children() {
                stats.nodes_with_children += 1;
            }
            stats.max_depth = stats.max_depth.max(node.depth);
            stats.last_activity = stats.last_activity.max(Some(node.updated_at));
        }

        stats
    }

    /// Point-in-time copy of every record, keyed by id
    pub async fn snapshot(&self) -> HashMap<String, Node> {
        self.state.read().await.nodes.clone()
    }

    /// Check every tree invariant against the current state
    pub async fn verify_hierarchy(&self) -> Vec<HierarchyViolation> {
        check_invariants(&self.state.read().await.nodes)
    }

    //
    // DELETE
    //

    /// Delete a node and its whole subtree
    ///
    /// The node is detached from its parent (`has_children` recomputed,
    /// `updated_at` refreshed) and pending auto-saves for every removed node
    /// are cancelled. Returns `existed = false` for unknown ids.
    pub async fn delete(&self, id: &str) -> Result<DeleteResult, NodeStoreError> {
        let mut state = self.state.write().await;

        let parent_id = match state.nodes.get(id) {
            Some(node) => node.parent_id.clone(),
            None => return Ok(DeleteResult::not_found()),
        };

        let removed = hierarchy::collect_subtree(&state.nodes, id);
        let now = state.tick();

        let mut changes = Changeset {
            upserts: Vec::new(),
            removals: removed.clone(),
        };
        if let Some(parent) = parent_id.as_deref().and_then(|p| state.nodes.get(p)) {
            let mut parent = parent.clone();
            parent.detach_child(id, now);
            changes.upserts.push(parent);
        }

        self.commit(&mut state, changes).await?;

        // Still under the write lock: timers waiting on it will observe the cancellation
        let cancelled = self.pending.cancel_many(&removed);

        tracing::debug!(
            "Deleted node '{}' with {} descendant(s), cancelled {} pending save(s)",
            id,
            removed.len() - 1,
            cancelled
        );
        for removed_id in &removed {
            self.emit_event(DomainEvent::NodeDeleted {
                id: removed_id.clone(),
            });
        }

        Ok(DeleteResult::removed(removed))
    }

    //
    // HIERARCHY
    //

    /// Reparent `node_id` under `new_parent_id`, or make it a root with `None`
    ///
    /// Both ends are validated before anything changes. The node is removed
    /// from its old parent's children and appended to the new parent's; its
    /// depth and the depth of every descendant are recomputed. `updated_at`
    /// is refreshed on the node and on both parents.
    ///
    /// # Errors
    ///
    /// - `NodeNotFound` if `node_id` does not exist
    /// - `InvalidParent` if `new_parent_id` does not exist
    /// - `CircularReference` if `new_parent_id` is the node or one of its descendants
    pub async fn move_node(
        &self,
        node_id: &str,
        new_parent_id: Option<&str>,
    ) -> Result<(), NodeStoreError> {
        let mut state = self.state.write().await;

        let mut moved = state.require(node_id)?.clone();
        if let Some(parent_id) = new_parent_id {
            if !state.nodes.contains_key(parent_id) {
                tracing::warn!("Rejected move of '{}': parent '{}' not found", node_id, parent_id);
                return Err(NodeStoreError::invalid_parent(parent_id));
            }
            if hierarchy::is_ancestor_or_self(&state.nodes, node_id, parent_id) {
                tracing::warn!("Rejected move of '{}' under its descendant '{}'", node_id, parent_id);
                return Err(NodeStoreError::circular_reference(format!(
                    "Cannot move node {} under its descendant {}",
                    node_id, parent_id
                )));
            }
        }

        let now = state.tick();
        let old_parent_id = moved.parent_id.clone();

        // Old and new parent may be the same record
        let mut parents: Vec<Node> = Vec::with_capacity(2);
        if let Some(old_parent) = old_parent_id.as_deref().and_then(|p| state.nodes.get(p)) {
            let mut old_parent = old_parent.clone();
            old_parent.detach_child(node_id, now);
            parents.push(old_parent);
        }

        match new_parent_id {
            Some(parent_id) => {
                let index = match parents.iter().position(|p| p.id == parent_id) {
                    Some(index) => index,
                    None => {
                        parents.push(state.require(parent_id)?.clone());
                        parents.len() - 1
                    }
                };
                let new_parent = &mut parents[index];
                new_parent.attach_child(node_id, now);
                moved.parent_id = Some(parent_id.to_string());
                moved.depth = new_parent.depth + 1;
            }
            None => {
                moved.parent_id = None;
                moved.depth = 0;
            }
        }
        moved.updated_at = now;

        let descendants = hierarchy::restage_descendant_depths(&state.nodes, &moved);
        let restaged = descendants.len();

        let mut changes = Changeset::default();
        changes.upserts.extend(parents);
        changes.upserts.push(moved);
        changes.upserts.extend(descendants);
        self.commit(&mut state, changes).await?;

        tracing::debug!(
            "Moved node '{}' from {:?} to {:?} ({} descendant depth(s) updated)",
            node_id,
            old_parent_id,
            new_parent_id,
            restaged
        );
        self.emit_event(DomainEvent::NodeMoved {
            id: node_id.to_string(),
            old_parent_id,
            new_parent_id: new_parent_id.map(str::to_string),
        });
        Ok(())
    }

    /// Flip the `expanded` flag of a node with children
    ///
    /// Returns `Ok(false)` without changing anything for leaf nodes, where
    /// expansion is meaningless.
    pub async fn toggle_expansion(&self, node_id: &str) -> Result<bool, NodeStoreError> {
        let mut state = self.state.write().await;

        let mut node = state.require(node_id)?.clone();
        if !node.has_children() {
            tracing::debug!("Ignored expansion toggle on leaf node '{}'", node_id);
            return Ok(false);
        }

        node.expanded = !node.expanded;
        node.updated_at = state.tick();
        self.commit(&mut state, Changeset::upsert(node.clone())).await?;

        self.emit_event(DomainEvent::NodeUpdated(node));
        Ok(true)
    }
}

fn sort_by_recent_update(nodes: &mut [Node]) {
    nodes.sort_by(|a, b| {
        b.updated_at
            .cmp(&a.updated_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

impl std::fmt::Debug for NodeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeStore")
            .field("config", &self.config)
            .field("pending_auto_saves", &self.pending.len())
            .finish_non_exhaustive()
    }
}
