//! Aggregated outcome of a migration run

use crate::taxonomy::{GroupName, ItemId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// Recoverable failure classes. None of these stop a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The canonical term could neither be created nor found afterwards
    TermConflict,
    /// The store rejected creation of the canonical term
    TermCreateFailure,
    /// Items tagged with a legacy term could not be listed
    ItemListFailure,
    /// Adding the canonical tag to one item failed
    ItemTagFailure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub group: GroupName,
    pub term: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<ItemId>,
    pub message: String,
}

/// Counts and failures collected over one pass of the orchestrator
#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub groups_processed: usize,
    /// Legacy groups that were absent or could not be listed
    pub groups_skipped: Vec<GroupName>,
    pub terms_created: usize,
    pub terms_reused: usize,
    pub items_reconciled: usize,
    pub items_already_tagged: usize,
    pub failures: Vec<Failure>,
}

impl MigrationReport {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            finished_at: None,
            groups_processed: 0,
            groups_skipped: Vec::new(),
            terms_created: 0,
            terms_reused: 0,
            items_reconciled: 0,
            items_already_tagged: 0,
            failures: Vec::new(),
        }
    }

    /// Number of store mutations this run performed
    pub fn writes(&self) -> usize {
        self.terms_created + self.items_reconciled
    }

    /// True when no recoverable failure was recorded
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub(crate) fn record_failure(&mut self, failure: Failure) {
        self.failures.push(failure);
    }

    pub(crate) fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }
}

impl fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run {}: {} group(s), {} skipped; terms {} created / {} reused; items {} tagged / {} already tagged; {} failure(s)",
            self.run_id,
            self.groups_processed,
            self.groups_skipped.len(),
            self.terms_created,
            self.terms_reused,
            self.items_reconciled,
            self.items_already_tagged,
            self.failures.len(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_report_is_clean_and_writes_nothing() {
        let report = MigrationReport::new(Uuid::new_v4());
        assert!(report.is_clean());
        assert_eq!(report.writes(), 0);
        assert!(report.finished_at.is_none());
    }

    #[test]
    fn writes_count_creations_and_new_tags_only() {
        let mut report = MigrationReport::new(Uuid::new_v4());
        report.terms_created = 2;
        report.terms_reused = 5;
        report.items_reconciled = 3;
        report.items_already_tagged = 9;
        assert_eq!(report.writes(), 5);
    }

    #[test]
    fn failures_serialize_with_snake_case_kind() {
        let mut report = MigrationReport::new(Uuid::nil());
        report.record_failure(Failure {
            kind: FailureKind::ItemTagFailure,
            group: GroupName::from("design_category"),
            term: "Logo".to_string(),
            item: Some(ItemId::from("42")),
            message: "disk full".to_string(),
        });
        assert!(!report.is_clean());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["failures"][0]["kind"], "item_tag_failure");
        assert_eq!(json["failures"][0]["item"], "42");
    }

    #[test]
    fn summary_line_mentions_counts() {
        let mut report = MigrationReport::new(Uuid::nil());
        report.terms_created = 3;
        let line = report.to_string();
        assert!(line.contains("3 created"), "{line}");
    }
}
