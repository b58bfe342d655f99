//! NodeSpace Outline
//!
//! This crate provides the in-memory node hierarchy behind the NodeSpace outliner:
//! titled, content-bearing nodes arranged in a strict tree, with reparenting,
//! search, and debounced per-node auto-save.
//!
//! # Architecture
//!
//! - **NodeStore**: canonical id → node mapping, enforces parent/child linkage and depth
//! - **AutoSaveCoordinator**: one pending deferred save per node, bursts coalesced
//! - **DataStore**: async persistence trait the store writes through to
//! - **Outline**: explicitly constructed session owning the store and the coordinator
//!
//! # Modules
//!
//! - [`models`] - Data structures (Node, SaveResult, NodeTree, etc.)
//! - [`services`] - NodeStore, AutoSaveCoordinator and the Outline session
//! - [`db`] - Persistence backends and domain events
//! - [`config`] - Runtime configuration
//! - [`utils`] - Text helpers (word counting, id validation)

pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use config::{AutoSaveConfig, ConfigError, OutlineConfig};
pub use db::{DataStore, DomainEvent, JsonFileDataStore, MemoryDataStore, StorageError};
pub use models::*;
pub use services::*;
