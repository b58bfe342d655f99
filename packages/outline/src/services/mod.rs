//! Business Services
//!
//! - `NodeStore` - CRUD operations and hierarchy management
//! - `AutoSaveCoordinator` - debounced per-node saves
//! - `Outline` - session wiring the two together
//!
//! Services own the in-memory hierarchy and write through to a
//! [`DataStore`](crate::db::DataStore) backend.

pub mod autosave;
pub mod error;
pub mod hierarchy;
pub mod node_store;
pub mod outline;
pub mod pending_saves;


pub use autosave::{AutoSaveCoordinator, PendingSave};
pub use error::NodeStoreError;
pub use hierarchy::{check_invariants, HierarchyViolation};
pub use node_store::NodeStore;
pub use outline::Outline;
pub use pending_saves::PendingSaves;
