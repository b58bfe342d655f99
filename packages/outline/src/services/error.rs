//! Service Layer Error Types
//!
//! Expected failures of store operations are returned as values of this type;
//! no store operation panics for a missing node, a bad parent, or a cycle.

use crate::config::ConfigError;
use crate::db::StorageError;
use thiserror::Error;

/// Node store operation errors
#[derive(Error, Debug)]
pub enum NodeStoreError {
    /// Node not found by ID
    #[error("Node not found: {id}")]
    NodeNotFound { id: String },

    /// Referenced parent does not exist
    #[error("Invalid parent node: {parent_id}")]
    InvalidParent { parent_id: String },

    /// Move would make a node its own ancestor
    #[error("Circular reference detected: {context}")]
    CircularReference { context: String },

    /// Caller-supplied id is not a usable identifier
    #[error("Invalid node ID format: '{0}'")]
    InvalidNodeId(String),

    /// Persistence backend failed; in-memory state is unchanged
    #[error("Storage operation failed: {0}")]
    Storage(#[from] StorageError),

    /// Hydrated records do not form a valid hierarchy
    #[error("Corrupt hierarchy: {0}")]
    CorruptHierarchy(String),

    /// Session configuration rejected
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

impl NodeStoreError {
    /// Create a node not found error
    pub fn node_not_found(id: impl Into<String>) -> Self {
        Self::NodeNotFound { id: id.into() }
    }

    /// Create an invalid parent error
    pub fn invalid_parent(parent_id: impl Into<String>) -> Self {
        Self::InvalidParent {
            parent_id: parent_id.into(),
        }
    }

    /// Create a circular reference error
    pub fn circular_reference(context: impl Into<String>) -> Self {
        Self::CircularReference {
            context: context.into(),
        }
    }

    /// True for the not-found family (unknown node or unknown parent)
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            NodeStoreError::NodeNotFound { .. } | NodeStoreError::InvalidParent { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            NodeStoreError::node_not_found("abc").to_string(),
            "Node not found: abc"
        );
        assert_eq!(
            NodeStoreError::invalid_parent("p").to_string(),
            "Invalid parent node: p"
        );
        assert_eq!(
            NodeStoreError::circular_reference("a under c").to_string(),
            "Circular reference detected: a under c"
        );
        assert_eq!(
            NodeStoreError::InvalidNodeId(String::new()).to_string(),
            "Invalid node ID format: ''"
        );
    }

    #[test]
    fn test_storage_error_conversion() {
        let err: NodeStoreError = StorageError::backend("offline").into();
        assert!(matches!(err, NodeStoreError::Storage(_)));
        assert!(!err.is_not_found());
        assert!(NodeStoreError::invalid_parent("p").is_not_found());
    }
}
