//! Migrator: drives deduplication and reconciliation over legacy groups

use super::dedup::ensure_canonical_term;
use super::reconcile::{reconcile_item, ReconcileOutcome};
use super::report::{Failure, FailureKind, MigrationReport};
use super::{MigrationError, MigrationResult};
use crate::storage::{ClassificationStore, StorageError, StorageResult};
use crate::taxonomy::{GroupName, ItemId, Term};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

/// What a run would do, computed without writing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationPlan {
    /// Canonical terms that would be created, in first-seen order
    pub terms_to_create: Vec<String>,
    /// Canonical tags that would be added, per term name
    pub tags_to_add: BTreeMap<String, usize>,
    pub groups_missing: Vec<GroupName>,
}

impl MigrationPlan {
    pub fn total_tags(&self) -> usize {
        self.tags_to_add.values().sum()
    }

    /// True when a run would perform no writes
    pub fn is_converged(&self) -> bool {
        self.terms_to_create.is_empty() && self.total_tags() == 0
    }
}

/// Consolidates legacy groups into the canonical group.
///
/// Safe to run any number of times, including concurrently against the
/// same store: every step is find-or-create or a set union. Legacy data is
/// never modified.
pub struct Migrator {
    store: Arc<dyn ClassificationStore>,
    canonical: GroupName,
}

impl Migrator {
    pub fn new(store: Arc<dyn ClassificationStore>, canonical: GroupName) -> Self {
        Self { store, canonical }
    }

    pub fn canonical(&self) -> &GroupName {
        &self.canonical
    }

    /// One full pass over `legacy_groups`, in the given order.
    ///
    /// Per-term and per-item failures are collected into the report. Only
    /// a fatal store error aborts the pass.
    pub fn run(&self, legacy_groups: &[GroupName]) -> MigrationResult<MigrationReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!("migration", %run_id, canonical = %self.canonical);
        let _enter = span.enter();

        let mut report = MigrationReport::new(run_id);
        for group in legacy_groups {
            if group == &self.canonical {
                warn!(%group, "canonical group listed as legacy; skipping");
                report.groups_skipped.push(group.clone());
                continue;
            }

            let terms = match self.store.list_terms(group) {
                Ok(terms) => terms,
                Err(err) if err.is_fatal() => return Err(abort(err)),
                Err(err) => {
                    debug!(%group, error = %err, "legacy group unavailable; skipping");
                    report.groups_skipped.push(group.clone());
                    continue;
                }
            };

            debug!(%group, terms = terms.len(), "migrating legacy group");
            report.groups_processed += 1;
            for term in &terms {
                self.migrate_term(group, term, &mut report)?;
            }
        }

        report.finish();
        info!(
            created = report.terms_created,
            reused = report.terms_reused,
            tagged = report.items_reconciled,
            already_tagged = report.items_already_tagged,
            failures = report.failures.len(),
            "migration pass complete"
        );
        Ok(report)
    }

    fn migrate_term(
        &self,
        group: &GroupName,
        term: &Term,
        report: &mut MigrationReport,
    ) -> MigrationResult<()> {
        let store = self.store.as_ref();

        let resolved = match ensure_canonical_term(store, &self.canonical, term) {
            Ok(resolved) => resolved,
            Err(err) if err.is_fatal() => return Err(abort(err)),
            Err(err) => {
                let kind = match err {
                    StorageError::Conflict { .. } => FailureKind::TermConflict,
                    _ => FailureKind::TermCreateFailure,
                };
                warn!(%group, term = %term.name, error = %err, "could not resolve canonical term");
                report.record_failure(Failure {
                    kind,
                    group: group.clone(),
                    term: term.name.clone(),
                    item: None,
                    message: err.to_string(),
                });
                return Ok(());
            }
        };
        if resolved.created {
            report.terms_created += 1;
        } else {
            report.terms_reused += 1;
        }

        let items = match store.list_items_tagged(group, term.id) {
            Ok(items) => items,
            Err(err) if err.is_fatal() => return Err(abort(err)),
            Err(err) => {
                warn!(%group, term = %term.name, error = %err, "could not list tagged items");
                report.record_failure(Failure {
                    kind: FailureKind::ItemListFailure,
                    group: group.clone(),
                    term: term.name.clone(),
                    item: None,
                    message: err.to_string(),
                });
                return Ok(());
            }
        };

        for item in &items {
            match reconcile_item(store, &self.canonical, item, resolved.term.id) {
                ReconcileOutcome::Tagged => {
                    debug!(%item, term = %resolved.term.name, "tagged item");
                    report.items_reconciled += 1;
                }
                ReconcileOutcome::AlreadyTagged => report.items_already_tagged += 1,
                ReconcileOutcome::Failed(err) if err.is_fatal() => return Err(abort(err)),
                ReconcileOutcome::Failed(err) => {
                    warn!(%group, term = %term.name, %item, error = %err, "could not tag item");
                    report.record_failure(Failure {
                        kind: FailureKind::ItemTagFailure,
                        group: group.clone(),
                        term: term.name.clone(),
                        item: Some(item.clone()),
                        message: err.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Compute what `run` would change, without writing.
    pub fn plan(&self, legacy_groups: &[GroupName]) -> MigrationResult<MigrationPlan> {
        self.build_plan(legacy_groups).map_err(|err| {
            if err.is_fatal() {
                abort(err)
            } else {
                MigrationError::Store(err)
            }
        })
    }

    fn build_plan(&self, legacy_groups: &[GroupName]) -> StorageResult<MigrationPlan> {
        let store = self.store.as_ref();
        let mut plan = MigrationPlan::default();
        // Items each canonical term name would carry after the run,
        // beyond those it already carries
        let mut pending: BTreeMap<String, BTreeSet<ItemId>> = BTreeMap::new();

        for group in legacy_groups {
            if group == &self.canonical {
                continue;
            }
            let terms = match store.list_terms(group) {
                Ok(terms) => terms,
                Err(err) if err.is_fatal() => return Err(err),
                Err(_) => {
                    plan.groups_missing.push(group.clone());
                    continue;
                }
            };

            for term in &terms {
                let existing: BTreeSet<ItemId> =
                    match store.find_term_by_name(&self.canonical, &term.name)? {
                        Some(canonical_term) => store
                            .list_items_tagged(&self.canonical, canonical_term.id)?
                            .into_iter()
                            .collect(),
                        None => {
                            if !plan.terms_to_create.contains(&term.name) {
                                plan.terms_to_create.push(term.name.clone());
                            }
                            BTreeSet::new()
                        }
                    };

                let entry = pending.entry(term.name.clone()).or_default();
                for item in store.list_items_tagged(group, term.id)? {
                    if !existing.contains(&item) {
                        entry.insert(item);
                    }
                }
            }
        }

        plan.tags_to_add = pending
            .into_iter()
            .filter(|(_, items)| !items.is_empty())
            .map(|(name, items)| (name, items.len()))
            .collect();
        Ok(plan)
    }
}

fn abort(err: StorageError) -> MigrationError {
    error!(error = %err, "store unavailable; aborting migration");
    MigrationError::StoreUnavailable(err)
}
