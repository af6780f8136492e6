//! Consolidation of legacy taxonomies into the canonical taxonomy
//!
//! For every term of every legacy group, the canonical group gains exactly
//! one term with the same name, and every item tagged with the legacy term
//! is also tagged with the canonical one. Nothing is ever removed, so a
//! run over converged data performs no writes.

mod dedup;
mod orchestrator;
mod reconcile;
mod report;

pub use dedup::{ensure_canonical_term, Resolved};
pub use orchestrator::{MigrationPlan, Migrator};
pub use reconcile::{reconcile_item, ReconcileOutcome};
pub use report::{Failure, FailureKind, MigrationReport};

use crate::storage::StorageError;
use thiserror::Error;

/// Errors that stop a migration pass
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[source] StorageError),

    /// Non-fatal store error surfaced by a dry run
    #[error("Store error: {0}")]
    Store(#[source] StorageError),
}

/// Result type for migration operations
pub type MigrationResult<T> = Result<T, MigrationError>;
