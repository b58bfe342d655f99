//! Tests for Node record helpers

#[cfg(test)]
mod tests {
    use crate::models::{CreateNodeParams, Node, NodeTree, NodeType, SaveResult};
    use chrono::{Duration, Utc};

    fn root(id: &str, content: &str) -> Node {
        Node::new_root(
            id.to_string(),
            NodeType::Text,
            content.to_string(),
            "Untitled".to_string(),
            Utc::now(),
        )
    }

    #[test]
    fn test_new_root_defaults() {
        let node = root("a", "  hello   world  ");
        assert_eq!(node.depth, 0);
        assert!(node.parent_id.is_none());
        assert_eq!(node.metadata.version, 1);
        assert_eq!(node.metadata.word_count, 2);
        assert!(!node.has_children());
        assert!(!node.expanded);
        assert_eq!(node.created_at, node.updated_at);
    }

    #[test]
    fn test_new_child_inherits_depth() {
        let mut parent = root("p", "");
        parent.depth = 3;
        let child = Node::new_child(
            "c".to_string(),
            NodeType::Task,
            "x".to_string(),
            "New Task".to_string(),
            &parent,
            Utc::now(),
        );
        assert_eq!(child.parent_id.as_deref(), Some("p"));
        assert_eq!(child.depth, 4);
    }

    #[test]
    fn test_apply_save_bumps_version_and_word_count() {
        let mut node = root("a", "one");
        let later = node.updated_at + Duration::milliseconds(5);

        node.apply_save("one two three".to_string(), "Renamed".to_string(), later);

        assert_eq!(node.metadata.version, 2);
        assert_eq!(node.metadata.word_count, 3);
        assert_eq!(node.title, "Renamed");
        assert_eq!(node.updated_at, later);
        assert!(node.created_at < node.updated_at);
    }

    #[test]
    fn test_attach_and_detach_child_keep_has_children_in_sync() {
        let mut parent = root("p", "");
        let now = Utc::now();

        parent.attach_child("c1", now);
        parent.attach_child("c2", now);
        parent.expanded = true;
        assert!(parent.has_children());
        assert_eq!(parent.metadata.children_ids, vec!["c1", "c2"]);

        assert!(parent.detach_child("c1", now));
        assert!(parent.has_children());
        assert!(parent.expanded);

        assert!(!parent.detach_child("missing", now));
        assert!(parent.detach_child("c2", now));
        assert!(!parent.has_children());
        assert!(!parent.expanded, "leaves cannot stay expanded");
    }

    #[test]
    fn test_node_type_default_titles() {
        assert_eq!(NodeType::Text.default_title("Untitled"), "Untitled");
        assert_eq!(NodeType::Task.default_title("Untitled"), "New Task");
        assert_eq!(NodeType::AiChat.default_title("Untitled"), "New Chat");
    }

    #[test]
    fn test_node_serializes_camel_case() {
        let mut node = root("a", "hi");
        node.attach_child("b", node.updated_at);
        let json = serde_json::to_value(&node).unwrap();

        assert_eq!(json["nodeType"], "text");
        assert_eq!(json["parentId"], serde_json::Value::Null);
        assert_eq!(json["metadata"]["wordCount"], 1);
        assert_eq!(json["metadata"]["hasChildren"], true);
        assert_eq!(json["metadata"]["childrenIds"][0], "b");

        let back: Node = serde_json::from_value(json).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn test_missing_version_defaults_to_one() {
        let json = serde_json::json!({
            "id": "legacy",
            "content": "",
            "title": "Untitled",
            "parentId": null,
            "depth": 0,
            "createdAt": "2025-01-01T00:00:00Z",
            "updatedAt": "2025-01-01T00:00:00Z",
            "metadata": { "wordCount": 0, "hasChildren": false }
        });
        let node: Node = serde_json::from_value(json).unwrap();
        assert_eq!(node.metadata.version, 1);
        assert_eq!(node.node_type, NodeType::Text);
        assert!(node.metadata.children_ids.is_empty());
    }

    #[test]
    fn test_create_params_builder() {
        let params = CreateNodeParams::text("body")
            .with_title("Title")
            .with_parent("p")
            .with_type(NodeType::AiChat);
        assert_eq!(params.content, "body");
        assert_eq!(params.title.as_deref(), Some("Title"));
        assert_eq!(params.parent_id.as_deref(), Some("p"));
        assert_eq!(params.node_type, NodeType::AiChat);
    }

    #[test]
    fn test_save_result_serialization_skips_empty_fields() {
        let json = serde_json::to_value(SaveResult::failed("boom")).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "boom");
        assert!(json.get("node").is_none());
    }

    #[test]
    fn test_tree_size() {
        let leaf = |id: &str| NodeTree {
            node: root(id, ""),
            children: vec![],
        };
        let tree = NodeTree {
            node: root("r", ""),
            children: vec![
                NodeTree {
                    node: root("a", ""),
                    children: vec![leaf("a1"), leaf("a2")],
                },
                leaf("b"),
            ],
        };
        assert_eq!(tree.size(), 5);
    }
}
