//! Domain Events for the outline store
//!
//! The node store emits one event per committed operation over a tokio
//! broadcast channel, so observers (UI bridges, indexers) can follow changes
//! without coupling to the store.
//!
//! # Event Flow
//!
//! 1. NodeStore validates and persists a change
//! 2. The change is applied in memory
//! 3. The matching domain event is broadcast
//!
//! Events are never emitted for rejected operations.

use crate::models::Node;
use serde::{Deserialize, Serialize};

/// Domain events emitted by NodeStore
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DomainEvent {
    /// A new node was created (including upserting saves)
    NodeCreated(Node),

    /// Content, title or expansion state changed
    NodeUpdated(Node),

    /// A node was reparented
    #[serde(rename_all = "camelCase")]
    NodeMoved {
        id: String,
        old_parent_id: Option<String>,
        new_parent_id: Option<String>,
    },

    /// A node was removed (one event per node in a deleted subtree)
    NodeDeleted { id: String },
}

impl DomainEvent {
    /// String representation of the event type, for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::NodeCreated(_) => "node:created",
            DomainEvent::NodeUpdated(_) => "node:updated",
            DomainEvent::NodeMoved { .. } => "node:moved",
            DomainEvent::NodeDeleted { .. } => "node:deleted",
        }
    }

    /// Id of the node the event is about
    pub fn node_id(&self) -> &str {
        match self {
            DomainEvent::NodeCreated(node) | DomainEvent::NodeUpdated(node) => &node.id,
            DomainEvent::NodeMoved { id, .. } | DomainEvent::NodeDeleted { id } => id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Contract test: internally tagged, flat JSON
    #[test]
    fn test_moved_event_serialization_contract() {
        let event = DomainEvent::NodeMoved {
            id: "child".to_string(),
            old_parent_id: Some("old".to_string()),
            new_parent_id: None,
        };

        let parsed = serde_json::to_value(&event).unwrap();
        assert_eq!(parsed["type"], "nodeMoved");
        assert_eq!(parsed["id"], "child");
        assert_eq!(parsed["oldParentId"], "old");
        assert_eq!(parsed["newParentId"], serde_json::Value::Null);
    }

    #[test]
    fn test_event_type_and_node_id() {
        let deleted = DomainEvent::NodeDeleted {
            id: "gone".to_string(),
        };
        assert_eq!(deleted.event_type(), "node:deleted");
        assert_eq!(deleted.node_id(), "gone");
    }
}
