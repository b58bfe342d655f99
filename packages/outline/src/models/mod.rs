//! Data Models
//!
//! - [`Node`] - the outline record with derived metadata
//! - [`SaveResult`], [`DeleteResult`] - operation outcomes
//! - [`NodeTree`] - nested hierarchy snapshot
//! - [`StoreStats`] - aggregate counters

mod node;
mod results;

#[cfg(test)]
mod node_test;

pub use node::{CreateNodeParams, Node, NodeMetadata, NodeType};
pub use results::{DeleteResult, NodeTree, SaveResult, StoreStats};
