//! Node Data Structures
//!
//! This module defines the `Node` record held by the outline store and the
//! derived metadata kept alongside it.
//!
//! # Derived Fields
//!
//! - `metadata.word_count`: recomputed whenever content changes
//! - `metadata.version`: starts at 1, bumped on every successful content save
//! - `metadata.has_children`: always equal to `!children_ids.is_empty()`
//!
//! Hierarchy fields (`parent_id`, `depth`, `children_ids`) are owned by
//! [`NodeStore`](crate::services::NodeStore); the helpers here only keep a
//! single record self-consistent.
//!
//! # Examples
//!
//! ```rust
//! use chrono::Utc;
//! use nodespace_outline::models::{Node, NodeType};
//!
//! let node = Node::new_root(
//!     "note-1".to_string(),
//!     NodeType::Text,
//!     "Hello outline world".to_string(),
//!     "Greeting".to_string(),
//!     Utc::now(),
//! );
//! assert_eq!(node.metadata.word_count, 3);
//! assert_eq!(node.metadata.version, 1);
//! assert!(node.is_root());
//! ```

use crate::utils::word_count;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default version value for serde deserialization (version 1)
fn default_version() -> u64 {
    1
}

/// Kind of content a node carries
///
/// Only affects the default title; all kinds share the same hierarchy rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeType {
    #[default]
    Text,
    Task,
    AiChat,
}

impl NodeType {
    /// Title used when a node of this type is created without one
    ///
    /// Text nodes use the session's configured default (normally "Untitled").
    pub fn default_title<'a>(&self, text_default: &'a str) -> &'a str {
        match self {
            NodeType::Text => text_default,
            NodeType::Task => "New Task",
            NodeType::AiChat => "New Chat",
        }
    }
}

/// Derived and hierarchy metadata for a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetadata {
    /// Whitespace-delimited token count of the trimmed content
    pub word_count: usize,

    /// Content version, incremented on every successful save
    #[serde(default = "default_version")]
    pub version: u64,

    /// Mirror of `!children_ids.is_empty()`
    pub has_children: bool,

    /// Direct children in append order
    #[serde(default)]
    pub children_ids: Vec<String>,
}

impl NodeMetadata {
    fn for_content(content: &str) -> Self {
        Self {
            word_count: word_count(content),
            version: default_version(),
            has_children: false,
            children_ids: Vec::new(),
        }
    }
}

/// A titled, content-bearing unit in the outline tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Opaque unique identifier, immutable once assigned
    pub id: String,

    /// Node kind (drives the default title)
    #[serde(default)]
    pub node_type: NodeType,

    /// Primary content (markdown-like prose)
    pub content: String,

    /// Display label
    pub title: String,

    /// Containing node, `None` for roots
    pub parent_id: Option<String>,

    /// Edge count to the root ancestor
    pub depth: u32,

    /// UI expansion state, only meaningful with children
    #[serde(default)]
    pub expanded: bool,

    /// Creation timestamp (immutable)
    pub created_at: DateTime<Utc>,

    /// Refreshed on every mutation of this record
    pub updated_at: DateTime<Utc>,

    pub metadata: NodeMetadata,
}

impl Node {
    /// Create a root-level node with version 1
    pub fn new_root(
        id: String,
        node_type: NodeType,
        content: String,
        title: String,
        now: DateTime<Utc>,
    ) -> Self {
        let metadata = NodeMetadata::for_content(&content);
        Self {
            id,
            node_type,
            content,
            title,
            parent_id: None,
            depth: 0,
            expanded: false,
            created_at: now,
            updated_at: now,
            metadata,
        }
    }

    /// Create a node placed directly under `parent`
    pub fn new_child(
        id: String,
        node_type: NodeType,
        content: String,
        title: String,
        parent: &Node,
        now: DateTime<Utc>,
    ) -> Self {
        let mut node = Self::new_root(id, node_type, content, title, now);
        node.parent_id = Some(parent.id.clone());
        node.depth = parent.depth + 1;
        node
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn has_children(&self) -> bool {
        self.metadata.has_children
    }

    /// Apply a content save: new content and title, recomputed word count, version bump
    pub fn apply_save(&mut self, content: String, title: String, now: DateTime<Utc>) {
        self.metadata.word_count = word_count(&content);
        self.metadata.version += 1;
        self.content = content;
        self.title = title;
        self.updated_at = now;
    }

    /// Append a child id (append-only; callers must not double-add)
    pub fn attach_child(&mut self, child_id: &str, now: DateTime<Utc>) {
        self.metadata.children_ids.push(child_id.to_string());
        self.sync_has_children();
        self.updated_at = now;
    }

    /// Remove a child id, returning whether it was present
    pub fn detach_child(&mut self, child_id: &str, now: DateTime<Utc>) -> bool {
        let before = self.metadata.children_ids.len();
        self.metadata.children_ids.retain(|id| id != child_id);
        let removed = self.metadata.children_ids.len() != before;
        self.sync_has_children();
        if !self.metadata.has_children {
            self.expanded = false;
        }
        self.updated_at = now;
        removed
    }

    fn sync_has_children(&mut self) {
        self.metadata.has_children = !self.metadata.children_ids.is_empty();
    }
}

/// Parameters for creating a node
///
/// `title: None` falls back to the node type's default title. `parent_id: None`
/// creates a root node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateNodeParams {
    /// Kind of node to create
    pub node_type: NodeType,
    /// Initial content
    pub content: String,
    /// Optional display label
    pub title: Option<String>,
    /// Optional parent node id
    pub parent_id: Option<String>,
}

impl CreateNodeParams {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_type(mut self, node_type: NodeType) -> Self {
        self.node_type = node_type;
        self
    }
}
