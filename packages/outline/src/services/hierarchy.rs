//! Hierarchy helpers over a flat node map
//!
//! Pure functions used by [`NodeStore`](super::NodeStore) to validate and
//! restage tree changes. None of them mutate the map; callers apply the
//! returned records as one changeset.
//!
//! All traversals use explicit stacks or queues so pathological deep trees
//! cannot exhaust the call stack.

use crate::models::{Node, NodeTree};
use std::collections::{HashMap, HashSet, VecDeque};
use thiserror::Error;

/// Node records keyed by id
pub type NodeMap = HashMap<String, Node>;

/// A broken tree invariant found by [`check_invariants`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HierarchyViolation {
    #[error("node {id} references missing parent {parent_id}")]
    MissingParent { id: String, parent_id: String },

    #[error("node {id} is not listed in the children of its parent {parent_id}")]
    NotListedByParent { id: String, parent_id: String },

    #[error("parent {parent_id} lists missing child {child_id}")]
    DanglingChild { parent_id: String, child_id: String },

    #[error("parent {parent_id} lists child {child_id} whose parent is {actual_parent_id:?}")]
    ParentMismatch {
        parent_id: String,
        child_id: String,
        actual_parent_id: Option<String>,
    },

    #[error("parent {parent_id} lists child {child_id} more than once")]
    DuplicateChild { parent_id: String, child_id: String },

    #[error("node {id} has depth {actual}, expected {expected}")]
    DepthMismatch { id: String, expected: u32, actual: u32 },

    #[error("node {id} has a stale hasChildren flag")]
    HasChildrenMismatch { id: String },

    #[error("node {id} is part of a parent cycle")]
    Cycle { id: String },
}

/// True when `ancestor_id` is `start_id` itself or one of its ancestors
///
/// Used to reject moves that would place a node under its own subtree.
pub(crate) fn is_ancestor_or_self(nodes: &NodeMap, ancestor_id: &str, start_id: &str) -> bool {
    let mut current = Some(start_id);
    let mut steps = 0;

    while let Some(id) = current {
        if id == ancestor_id {
            return true;
        }
        // A corrupted map could contain a parent cycle; never walk more than n links
        steps += 1;
        if steps > nodes.len() {
            break;
        }
        current = nodes.get(id).and_then(|node| node.parent_id.as_deref());
    }

    false
}

/// Ids of the subtree rooted at `root_id`, root first, breadth-first
///
/// Empty when the root does not exist.
pub(crate) fn collect_subtree(nodes: &NodeMap, root_id: &str) -> Vec<String> {
    let mut ids = Vec::new();
    let mut seen = HashSet::new();
    let mut queue = VecDeque::from([root_id]);

    while let Some(id) = queue.pop_front() {
        let Some(node) = nodes.get(id) else {
            continue;
        };
        if !seen.insert(id) {
            continue;
        }
        ids.push(id.to_string());
        queue.extend(node.metadata.children_ids.iter().map(String::as_str));
    }

    ids
}

/// Copies of every descendant of `moved` whose depth differs from `parent depth + 1`
///
/// `moved` must already carry its new depth. Depth-first walk with an explicit
/// stack, O(subtree size).
pub(crate) fn restage_descendant_depths(nodes: &NodeMap, moved: &Node) -> Vec<Node> {
    let mut staged = Vec::new();
    let mut stack: Vec<(&str, u32)> = moved
        .metadata
        .children_ids
        .iter()
        .map(|id| (id.as_str(), moved.depth + 1))
        .collect();

    while let Some((id, depth)) = stack.pop() {
        let Some(node) = nodes.get(id) else {
            continue;
        };

        stack.extend(
            node.metadata
                .children_ids
                .iter()
                .map(|child| (child.as_str(), depth + 1)),
        );

        if node.depth != depth {
            let mut restaged = node.clone();
            restaged.depth = depth;
            staged.push(restaged);
        }
    }

    staged
}

/// Direct children of `parent_id`, sorted by creation time
///
/// The sort is stable, so siblings created at the same instant keep their
/// append order.
pub(crate) fn sorted_children<'a>(nodes: &'a NodeMap, parent_id: &str) -> Vec<&'a Node> {
    let Some(parent) = nodes.get(parent_id) else {
        return Vec::new();
    };

    let mut children: Vec<&Node> = parent
        .metadata
        .children_ids
        .iter()
        .filter_map(|id| nodes.get(id))
        .collect();
    children.sort_by_key(|node| node.created_at);
    children
}

/// Root nodes sorted by creation time (ties broken by id)
pub(crate) fn sorted_roots(nodes: &NodeMap) -> Vec<&Node> {
    let mut roots: Vec<&Node> = nodes.values().filter(|node| node.is_root()).collect();
    roots.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    roots
}

/// Build nested snapshots for the given roots
///
/// Iterative: a pre-order pass records the visit order, then trees are
/// assembled bottom-up in reverse order.
pub(crate) fn build_forest(nodes: &NodeMap, roots: &[&Node]) -> Vec<NodeTree> {
    let mut order: Vec<&Node> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut stack: Vec<&Node> = roots.iter().rev().copied().collect();

    while let Some(node) = stack.pop() {
        if !seen.insert(node.id.as_str()) {
            continue;
        }
        order.push(node);
        stack.extend(sorted_children(nodes, &node.id).into_iter().rev());
    }

    let mut built: HashMap<&str, NodeTree> = HashMap::with_capacity(order.len());
    for node in order.into_iter().rev() {
        let children = sorted_children(nodes, &node.id)
            .into_iter()
            .filter_map(|child| built.remove(child.id.as_str()))
            .collect();
        built.insert(
            node.id.as_str(),
            NodeTree {
                node: node.clone(),
                children,
            },
        );
    }

    roots
        .iter()
        .filter_map(|root| built.remove(root.id.as_str()))
        .collect()
}

/// Check all tree invariants, returning every violation found
///
/// 1. a child's parent exists and lists it
/// 2. every listed child exists and points back
/// 3. depth is 0 for roots, parent depth + 1 otherwise
/// 4. no parent cycles
/// 5. `has_children` mirrors `children_ids`
pub fn check_invariants(nodes: &NodeMap) -> Vec<HierarchyViolation> {
    let mut violations = Vec::new();

    for node in nodes.values() {
        if node.metadata.has_children == node.metadata.children_ids.is_empty() {
            violations.push(HierarchyViolation::HasChildrenMismatch {
                id: node.id.clone(),
            });
        }

        match node.parent_id.as_deref() {
            None if node.depth != 0 => violations.push(HierarchyViolation::DepthMismatch {
                id: node.id.clone(),
                expected: 0,
                actual: node.depth,
            }),
            None => {}
            Some(parent_id) => match nodes.get(parent_id) {
                None => violations.push(HierarchyViolation::MissingParent {
                    id: node.id.clone(),
                    parent_id: parent_id.to_string(),
                }),
                Some(parent) => {
                    if !parent.metadata.children_ids.contains(&node.id) {
                        violations.push(HierarchyViolation::NotListedByParent {
                            id: node.id.clone(),
                            parent_id: parent_id.to_string(),
                        });
                    }
                    if node.depth != parent.depth + 1 {
                        violations.push(HierarchyViolation::DepthMismatch {
                            id: node.id.clone(),
                            expected: parent.depth + 1,
                            actual: node.depth,
                        });
                    }
                }
            },
        }

        let mut listed = HashSet::new();
        for child_id in &node.metadata.children_ids {
            if !listed.insert(child_id.as_str()) {
                violations.push(HierarchyViolation::DuplicateChild {
                    parent_id: node.id.clone(),
                    child_id: child_id.clone(),
                });
                continue;
            }
            match nodes.get(child_id) {
                None => violations.push(HierarchyViolation::DanglingChild {
                    parent_id: node.id.clone(),
                    child_id: child_id.clone(),
                }),
                Some(child) if child.parent_id.as_deref() != Some(node.id.as_str()) => {
                    violations.push(HierarchyViolation::ParentMismatch {
                        parent_id: node.id.clone(),
                        child_id: child_id.clone(),
                        actual_parent_id: child.parent_id.clone(),
                    })
                }
                Some(_) => {}
            }
        }
    }

    // Nodes whose parent chain never reaches a root are in a cycle
    for node in nodes.values() {
        if node.parent_id.is_some() && !reaches_root(nodes, node) {
            violations.push(HierarchyViolation::Cycle {
                id: node.id.clone(),
            });
        }
    }

    violations
}

fn reaches_root(nodes: &NodeMap, start: &Node) -> bool {
    let mut current = start;
    for _ in 0..=nodes.len() {
        match current.parent_id.as_deref() {
            None => return true,
            // Missing parents are reported separately
            Some(parent_id) => match nodes.get(parent_id) {
                None => return true,
                Some(parent) => current = parent,
            },
        }
    }
    false
}
