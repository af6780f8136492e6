//! Version gate controller
//!
//! Evaluated on each administrative request. When the persisted version
//! marker differs from the running version, the canonical schema is
//! registered, legacy taxonomies are migrated, and the route table is
//! rebuilt; the marker is then advanced. Independently, the route table is
//! rebuilt at most once per refresh-guard window.

mod clock;
mod controller;
mod guard;

pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::{GateOutcome, GateSettings, GateState, GateStatus, VersionGate, UNVERSIONED};
pub use guard::RefreshGuard;

use crate::migration::MigrationError;
use crate::storage::StorageError;
use thiserror::Error;

/// Errors that stop a gate invocation. The version marker is left as it
/// was, so the next invocation retries.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("Schema registration failed: {0}")]
    SchemaRegistration(#[source] StorageError),

    #[error("Migration aborted: {0}")]
    Migration(#[from] MigrationError),

    #[error("Store error: {0}")]
    Store(#[from] StorageError),
}

/// Result type for gate operations
pub type GateResult<T> = Result<T, GateError>;
