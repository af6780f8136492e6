//! Additive tagging of items with their canonical term

use crate::storage::{ClassificationStore, StorageError};
use crate::taxonomy::{GroupName, ItemId, TermRef};

/// Result of reconciling one item
#[derive(Debug)]
pub enum ReconcileOutcome {
    /// The canonical tag was added
    Tagged,
    /// The item already carried the canonical tag
    AlreadyTagged,
    Failed(StorageError),
}

/// Union `term` into the item's canonical tag set.
///
/// Existing tags, legacy or canonical, are never touched; a second call
/// for the same pair is a no-op.
pub fn reconcile_item(
    store: &dyn ClassificationStore,
    canonical: &GroupName,
    item: &ItemId,
    term: TermRef,
) -> ReconcileOutcome {
    match store.add_tag(item, canonical, term) {
        Ok(true) => ReconcileOutcome::Tagged,
        Ok(false) => ReconcileOutcome::AlreadyTagged,
        Err(err) => ReconcileOutcome::Failed(err),
    }
}
