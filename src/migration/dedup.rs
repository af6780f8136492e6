//! Canonical term resolution
//!
//! Matching is by exact, case-sensitive name. An existing canonical term
//! is returned as is: its slug and description are never overwritten.

use crate::storage::{ClassificationStore, StorageError, StorageResult};
use crate::taxonomy::{GroupName, NewTerm, Term};
use tracing::debug;

/// Canonical term for a legacy term, and whether this call created it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub term: Term,
    pub created: bool,
}

/// Find or create the canonical counterpart of `legacy`.
///
/// A `Conflict` on creation means another run created the same name in
/// between; the existing term is looked up and returned instead, so
/// concurrent runs converge on a single canonical term.
pub fn ensure_canonical_term(
    store: &dyn ClassificationStore,
    canonical: &GroupName,
    legacy: &Term,
) -> StorageResult<Resolved> {
    if let Some(term) = store.find_term_by_name(canonical, &legacy.name)? {
        return Ok(Resolved {
            term,
            created: false,
        });
    }

    match store.create_term(canonical, &NewTerm::copy_of(legacy)) {
        Ok(term) => {
            debug!(group = %canonical, term = %term.name, id = %term.id, "created canonical term");
            Ok(Resolved {
                term,
                created: true,
            })
        }
        Err(StorageError::Conflict { group, name }) => {
            match store.find_term_by_name(canonical, &legacy.name)? {
                Some(term) => Ok(Resolved {
                    term,
                    created: false,
                }),
                None => Err(StorageError::Conflict { group, name }),
            }
        }
        Err(err) => Err(err),
    }
}
