//! Utility functions shared across the outline store

pub mod text;

pub use text::{is_valid_node_id, word_count};
