//! Folio: consolidation of legacy portfolio taxonomies
//!
//! A portfolio site that grew several grouping systems (murals, design,
//! fine art, ...) converges them into one canonical taxonomy without losing
//! or duplicating any item-to-term association.
//!
//! # Core Concepts
//!
//! - **Legacy groups**: pre-existing taxonomies, read but never modified
//! - **Canonical group**: the single target taxonomy; only ever grows
//! - **Migrator**: find-or-create each legacy term in the canonical group,
//!   then union-tag every item that carried it
//! - **VersionGate**: runs registration and migration once per version
//!   change, plus a time-boxed route-table refresh
//!
//! # Example
//!
//! ```
//! use folio::{FolioConfig, MemoryStore, VersionGate};
//! use std::sync::Arc;
//!
//! let store = Arc::new(MemoryStore::new());
//! let gate = VersionGate::new(store, FolioConfig::default().gate_settings());
//! let outcome = gate.on_activate().unwrap();
//! assert!(outcome.marker_advanced);
//! ```

pub mod config;
pub mod gate;
pub mod migration;
pub mod seed;
pub mod storage;
pub mod taxonomy;

pub use config::{ConfigError, FolioConfig};
pub use gate::{GateError, GateOutcome, GateSettings, GateState, GateStatus, VersionGate};
pub use migration::{MigrationError, MigrationPlan, MigrationReport, Migrator};
pub use storage::{
    AdminStore, ClassificationStore, MemoryStore, OpenStore, SqliteStore, StorageError,
    StorageResult,
};
pub use taxonomy::{CanonicalSchema, GroupName, ItemId, NewTerm, Term, TermRef};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
