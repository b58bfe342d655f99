//! Operation result types returned by the outline store

use super::Node;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of a content save
///
/// Saves never return `Err`: failures are reported through `success = false`
/// and a human-readable `error`.
///
/// # Examples
///
/// ```rust
/// use nodespace_outline::models::SaveResult;
///
/// let result = SaveResult::failed("Invalid node ID format: ''");
/// assert!(!result.success);
/// assert!(result.node.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveResult {
    pub success: bool,

    /// The node as stored after the save
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<Node>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SaveResult {
    pub fn saved(node: Node) -> Self {
        Self {
            success: true,
            node: Some(node),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            node: None,
            error: Some(error.into()),
        }
    }
}

/// Result of a delete operation
///
/// Deleting a node removes its whole subtree; `removed_ids` lists the node
/// first, followed by its descendants in breadth-first order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    /// Whether the node existed before deletion
    ///
    /// - `true`: Node existed and was deleted
    /// - `false`: Node didn't exist (idempotent no-op)
    pub existed: bool,

    pub removed_ids: Vec<String>,
}

impl DeleteResult {
    pub fn removed(removed_ids: Vec<String>) -> Self {
        Self {
            existed: true,
            removed_ids,
        }
    }

    pub fn not_found() -> Self {
        Self {
            existed: false,
            removed_ids: Vec::new(),
        }
    }
}

/// Nested snapshot of a node and its descendants
///
/// Produced fresh on every call; mutating the store afterwards does not
/// affect an existing snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeTree {
    pub node: Node,
    pub children: Vec<NodeTree>,
}

impl NodeTree {
    /// Number of nodes in this snapshot, including the root
    pub fn size(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(tree) = stack.pop() {
            count += 1;
            stack.extend(tree.children.iter());
        }
        count
    }
}

/// Read-only aggregate over the current store state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub total_nodes: usize,
    pub root_count: usize,
    pub max_depth: u32,
    pub nodes_with_children: usize,
    pub pending_auto_saves: usize,
    /// Most recent `updated_at` across all nodes
    pub last_activity: Option<DateTime<Utc>>,
}
