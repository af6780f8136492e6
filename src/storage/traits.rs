//! Storage trait definitions

use crate::taxonomy::{CanonicalSchema, GroupName, ItemId, NewTerm, Term, TermRef};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Group not found: {0}")]
    NotFound(GroupName),

    #[error("Term already exists in {group}: {name}")]
    Conflict { group: GroupName, name: String },

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid data: {0}")]
    Invalid(String),
}

impl StorageError {
    /// True when the store as a whole cannot be used; the current run
    /// must stop and be retried on a later invocation.
    pub fn is_fatal(&self) -> bool {
        matches!(self, StorageError::Unavailable(_))
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        use rusqlite::ErrorCode;

        match err.sqlite_error_code() {
            Some(
                ErrorCode::CannotOpen
                | ErrorCode::NotADatabase
                | ErrorCode::DatabaseCorrupt
                | ErrorCode::SystemIoFailure
                | ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked,
            ) => StorageError::Unavailable(err.to_string()),
            _ => StorageError::Database(err),
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Read/write access to taxonomies, their terms, item tags and the
/// persisted markers used by the version gate.
///
/// Every method is individually atomic; no cross-call transaction is
/// assumed. Implementations must be thread-safe (Send + Sync) since two
/// administrative requests may drive the same store concurrently.
pub trait ClassificationStore: Send + Sync {
    // === Terms ===

    /// All terms of a group, in the store's natural order.
    /// Fails with `NotFound` when the group does not exist.
    fn list_terms(&self, group: &GroupName) -> StorageResult<Vec<Term>>;

    /// Exact, case-sensitive lookup by name
    fn find_term_by_name(&self, group: &GroupName, name: &str) -> StorageResult<Option<Term>>;

    /// Create a term. Fails with `Conflict` if a term with the same name
    /// already exists in the group.
    fn create_term(&self, group: &GroupName, term: &NewTerm) -> StorageResult<Term>;

    // === Tags ===

    /// Items carrying `term` in `group`
    fn list_items_tagged(&self, group: &GroupName, term: TermRef) -> StorageResult<Vec<ItemId>>;

    /// Add `term` to the item's set for `group` (set union, never replace).
    /// Returns `true` when the tag was newly added.
    fn add_tag(&self, item: &ItemId, group: &GroupName, term: TermRef) -> StorageResult<bool>;

    // === Markers ===

    fn get_marker(&self, key: &str) -> StorageResult<Option<String>>;

    fn set_marker(&self, key: &str, value: &str) -> StorageResult<()>;

    // === Schema & routes ===

    /// Declare the canonical group and its route patterns. Idempotent.
    fn register_schema(&self, schema: &CanonicalSchema) -> StorageResult<()>;

    /// Rebuild the route table from registered patterns and current
    /// terms. Returns the number of routes written.
    fn refresh_routes(&self) -> StorageResult<usize>;
}

/// A materialized route
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Route {
    pub path: String,
    pub query: String,
}

/// Operator-side access used for seeding fixtures and inspection.
///
/// Not used by migration itself, which only goes through
/// `ClassificationStore`.
pub trait AdminStore: ClassificationStore {
    /// Create the group if missing. Returns `true` if it was created.
    fn ensure_group(&self, group: &GroupName, label: &str) -> StorageResult<bool>;

    /// All known groups with their labels, sorted by name
    fn list_groups(&self) -> StorageResult<Vec<(GroupName, String)>>;

    /// Every (group, term) attached to an item
    fn tags_of(&self, item: &ItemId) -> StorageResult<Vec<(GroupName, Term)>>;

    /// The route table as last refreshed, sorted by path
    fn list_routes(&self) -> StorageResult<Vec<Route>>;
}

/// Extension trait for opening stores from paths
pub trait OpenStore: ClassificationStore + Sized {
    /// Open or create a store at the given path
    fn open(path: impl AsRef<Path>) -> StorageResult<Self>;

    /// Create an in-memory store (useful for testing)
    fn open_in_memory() -> StorageResult<Self>;
}
