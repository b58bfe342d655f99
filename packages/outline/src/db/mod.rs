//! Persistence Layer
//!
//! - [`DataStore`] - async get/put/delete/list abstraction the node store writes through to
//! - [`MemoryDataStore`] - process-lifetime backend (default)
//! - [`JsonFileDataStore`] - one JSON document per node in a directory
//! - [`DomainEvent`] - change notifications broadcast after each commit

pub mod data_store;
pub mod error;
pub mod events;
pub mod file_store;

pub use data_store::{DataStore, MemoryDataStore};
pub use error::StorageError;
pub use events::DomainEvent;
pub use file_store::JsonFileDataStore;
