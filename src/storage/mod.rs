//! Storage backends for folio
//!
//! Migration and the version gate talk to storage only through the
//! `ClassificationStore` trait. `SqliteStore` is the persistent backend;
//! `MemoryStore` backs tests and embedders.

mod memory;
mod sqlite;
mod traits;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{
    AdminStore, ClassificationStore, OpenStore, Route, StorageError, StorageResult,
};
