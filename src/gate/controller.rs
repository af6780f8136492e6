//! VersionGate: decides when schema registration and migration must run

use super::clock::{Clock, SystemClock};
use super::guard::RefreshGuard;
use super::{GateError, GateResult};
use crate::migration::{MigrationReport, Migrator};
use crate::storage::ClassificationStore;
use crate::taxonomy::{CanonicalSchema, GroupName};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Version assumed when no marker has been written yet
pub const UNVERSIONED: &str = "0.0.0";

/// Lifecycle of the installed schema relative to the running version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateState {
    /// No version marker persisted
    Unknown,
    /// Marker differs from the running version
    Stale,
    /// Registration and migration in progress
    Converging,
    /// Marker equals the running version
    Current,
}

impl fmt::Display for GateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GateState::Unknown => "unknown",
            GateState::Stale => "stale",
            GateState::Converging => "converging",
            GateState::Current => "current",
        };
        f.write_str(s)
    }
}

/// Everything the gate needs to know about the running system
#[derive(Debug, Clone)]
pub struct GateSettings {
    pub version: String,
    pub version_marker_key: String,
    pub refresh_guard_key: String,
    pub refresh_window: Duration,
    pub schema: CanonicalSchema,
    /// Processing order is stable across runs
    pub legacy_groups: Vec<GroupName>,
}

/// What one gate invocation observed and did
#[derive(Debug, Clone, Serialize)]
pub struct GateOutcome {
    /// State read from the version marker before acting
    pub observed: GateState,
    /// State after acting
    pub state: GateState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<MigrationReport>,
    pub marker_advanced: bool,
    pub routes_refreshed: bool,
}

impl GateOutcome {
    fn idle(observed: GateState) -> Self {
        Self {
            observed,
            state: observed,
            report: None,
            marker_advanced: false,
            routes_refreshed: false,
        }
    }
}

/// Read-only view of the gate
#[derive(Debug, Clone, Serialize)]
pub struct GateStatus {
    pub running_version: String,
    pub installed_version: Option<String>,
    pub state: GateState,
    pub guard_expires_at: Option<DateTime<Utc>>,
    pub guard_active: bool,
}

/// Version-gated convergence of the canonical taxonomy.
///
/// The installed version marker is compared to the running version for
/// inequality only, so upgrades and downgrades both trigger a new pass.
/// A second, independent check refreshes the route table whenever the
/// refresh guard has lapsed.
///
/// Concurrent invocations may both observe `Stale` and both converge;
/// every step is idempotent, so the result is the same as one pass.
pub struct VersionGate {
    store: Arc<dyn ClassificationStore>,
    migrator: Migrator,
    guard: RefreshGuard,
    clock: Arc<dyn Clock>,
    settings: GateSettings,
}

impl VersionGate {
    pub fn new(store: Arc<dyn ClassificationStore>, settings: GateSettings) -> Self {
        let migrator = Migrator::new(store.clone(), settings.schema.group.clone());
        let guard = RefreshGuard::new(settings.refresh_guard_key.clone(), settings.refresh_window);
        Self {
            store,
            migrator,
            guard,
            clock: Arc::new(SystemClock),
            settings,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &GateSettings {
        &self.settings
    }

    pub fn migrator(&self) -> &Migrator {
        &self.migrator
    }

    /// Run when the system is enabled: converge regardless of the marker.
    pub fn on_activate(&self) -> GateResult<GateOutcome> {
        let observed = self.observe()?;
        info!(%observed, version = %self.settings.version, "activation; forcing convergence");
        let mut outcome = self.converge(observed)?;
        if !outcome.routes_refreshed {
            outcome.routes_refreshed = self.refresh_if_guard_lapsed()?;
        }
        Ok(outcome)
    }

    /// Run on every administrative request: the version check first,
    /// then the refresh-guard check.
    pub fn on_admin_request(&self) -> GateResult<GateOutcome> {
        let observed = self.observe()?;
        let mut outcome = match observed {
            GateState::Current => GateOutcome::idle(observed),
            _ => {
                info!(%observed, version = %self.settings.version, "installed version differs");
                self.converge(observed)?
            }
        };

        if !outcome.routes_refreshed {
            outcome.routes_refreshed = self.refresh_if_guard_lapsed()?;
        }
        Ok(outcome)
    }

    /// Current state without writing anything
    pub fn status(&self) -> GateResult<GateStatus> {
        let installed_version = self.store.get_marker(&self.settings.version_marker_key)?;
        let state = self.classify(installed_version.as_deref());
        let now = self.clock.now();
        let guard_expires_at = self.guard.expires_at(self.store.as_ref())?;
        Ok(GateStatus {
            running_version: self.settings.version.clone(),
            installed_version,
            state,
            guard_active: guard_expires_at.is_some_and(|at| at > now),
            guard_expires_at,
        })
    }

    fn observe(&self) -> GateResult<GateState> {
        let marker = self.store.get_marker(&self.settings.version_marker_key)?;
        Ok(self.classify(marker.as_deref()))
    }

    fn classify(&self, marker: Option<&str>) -> GateState {
        let installed = marker.unwrap_or(UNVERSIONED);
        if installed == self.settings.version {
            GateState::Current
        } else if marker.is_none() {
            GateState::Unknown
        } else {
            GateState::Stale
        }
    }

    /// Stale -> Converging -> Current. The marker is written last, and
    /// only after a clean migration pass; any earlier stop leaves the gate
    /// stale so the next request retries.
    fn converge(&self, observed: GateState) -> GateResult<GateOutcome> {
        debug!(state = %GateState::Converging, "registering canonical schema");
        self.store
            .register_schema(&self.settings.schema)
            .map_err(GateError::SchemaRegistration)?;

        let report = self.migrator.run(&self.settings.legacy_groups)?;
        if !report.is_clean() {
            warn!(
                failures = report.failures.len(),
                "migration incomplete; version marker not advanced"
            );
            return Ok(GateOutcome {
                observed,
                state: GateState::Stale,
                report: Some(report),
                marker_advanced: false,
                routes_refreshed: false,
            });
        }

        let routes = self.store.refresh_routes()?;
        self.store
            .set_marker(&self.settings.version_marker_key, &self.settings.version)?;
        let expires = self.guard.arm(self.store.as_ref(), self.clock.now())?;
        info!(
            version = %self.settings.version,
            routes,
            guard_expires = %expires,
            "canonical taxonomy converged"
        );

        Ok(GateOutcome {
            observed,
            state: GateState::Current,
            report: Some(report),
            marker_advanced: true,
            routes_refreshed: true,
        })
    }

    fn refresh_if_guard_lapsed(&self) -> GateResult<bool> {
        let now = self.clock.now();
        if self.guard.is_active(self.store.as_ref(), now)? {
            return Ok(false);
        }
        let routes = self.store.refresh_routes()?;
        let expires = self.guard.arm(self.store.as_ref(), now)?;
        info!(routes, guard_expires = %expires, "refresh guard lapsed; route table rebuilt");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::ManualClock;
    use crate::storage::{AdminStore, MemoryStore};
    use crate::taxonomy::{ItemId, NewTerm};

    fn settings(version: &str) -> GateSettings {
        GateSettings {
            version: version.to_string(),
            version_marker_key: "folio_version".to_string(),
            refresh_guard_key: "folio_flush_routes".to_string(),
            refresh_window: Duration::hours(1),
            schema: CanonicalSchema::new(
                GroupName::from("portfolio_category"),
                "Portfolio Categories",
                "portfolio-category",
            ),
            legacy_groups: vec![GroupName::from("murals_category")],
        }
    }

    fn seeded() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        let murals = GroupName::from("murals_category");
        store.ensure_group(&murals, "Murals").unwrap();
        let term = store.create_term(&murals, &NewTerm::new("Sunset")).unwrap();
        store.add_tag(&ItemId::from("a"), &murals, term.id).unwrap();
        store
    }

    fn gate(store: &Arc<MemoryStore>, version: &str, clock: &Arc<ManualClock>) -> VersionGate {
        VersionGate::new(store.clone(), settings(version)).with_clock(clock.clone())
    }

    #[test]
    fn first_request_converges_from_unknown() {
        let store = seeded();
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let outcome = gate(&store, "1.0.0", &clock).on_admin_request().unwrap();

        assert_eq!(outcome.observed, GateState::Unknown);
        assert_eq!(outcome.state, GateState::Current);
        assert!(outcome.marker_advanced);
        assert!(outcome.routes_refreshed);
        assert_eq!(
            store.get_marker("folio_version").unwrap().as_deref(),
            Some("1.0.0")
        );
        assert_eq!(store.list_routes().unwrap().len(), 2);
    }

    #[test]
    fn matching_marker_is_a_noop() {
        let store = seeded();
        let clock = Arc::new(ManualClock::new(Utc::now()));
        gate(&store, "1.0.0", &clock).on_admin_request().unwrap();

        let outcome = gate(&store, "1.0.0", &clock).on_admin_request().unwrap();
        assert_eq!(outcome.observed, GateState::Current);
        assert!(outcome.report.is_none());
        assert!(!outcome.routes_refreshed);
    }

    #[test]
    fn downgrade_also_reconverges() {
        let store = seeded();
        let clock = Arc::new(ManualClock::new(Utc::now()));
        gate(&store, "2.0.0", &clock).on_admin_request().unwrap();

        let outcome = gate(&store, "1.9.0", &clock).on_admin_request().unwrap();
        assert_eq!(outcome.observed, GateState::Stale);
        assert!(outcome.marker_advanced);
        assert_eq!(
            store.get_marker("folio_version").unwrap().as_deref(),
            Some("1.9.0")
        );
    }

    #[test]
    fn lapsed_guard_refreshes_routes_without_migrating() {
        let store = seeded();
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let gate = gate(&store, "1.0.0", &clock);
        gate.on_admin_request().unwrap();

        clock.advance(Duration::minutes(30));
        assert!(!gate.on_admin_request().unwrap().routes_refreshed);

        clock.advance(Duration::minutes(31));
        let outcome = gate.on_admin_request().unwrap();
        assert!(outcome.routes_refreshed);
        assert!(outcome.report.is_none());

        // Re-armed for another window
        assert!(!gate.on_admin_request().unwrap().routes_refreshed);
    }

    #[test]
    fn activation_forces_convergence() {
        let store = seeded();
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let gate = gate(&store, "1.0.0", &clock);
        gate.on_admin_request().unwrap();

        let outcome = gate.on_activate().unwrap();
        assert_eq!(outcome.observed, GateState::Current);
        let report = outcome.report.unwrap();
        assert_eq!(report.writes(), 0);
        assert_eq!(report.items_already_tagged, 1);
    }

    #[test]
    fn offline_store_leaves_gate_stale() {
        let store = seeded();
        let clock = Arc::new(ManualClock::new(Utc::now()));
        store.set_marker("folio_version", "0.9.0").unwrap();
        store.set_unavailable(true);

        let gate = gate(&store, "1.0.0", &clock);
        // Marker read fails first when the store is offline
        assert!(gate.on_admin_request().is_err());

        store.set_unavailable(false);
        assert_eq!(gate.status().unwrap().state, GateState::Stale);
        assert!(gate.on_admin_request().unwrap().marker_advanced);
    }

    #[test]
    fn unclean_run_keeps_marker_back() {
        let store = seeded();
        store.fail_tag_for(ItemId::from("a"));
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let gate = gate(&store, "1.0.0", &clock);

        let outcome = gate.on_admin_request().unwrap();
        assert_eq!(outcome.state, GateState::Stale);
        assert!(!outcome.marker_advanced);
        assert!(store.get_marker("folio_version").unwrap().is_none());
        // Guard check still runs independently
        assert!(outcome.routes_refreshed);
    }

    #[test]
    fn unclean_activation_still_refreshes_lapsed_routes() {
        let store = seeded();
        store.fail_tag_for(ItemId::from("a"));
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let gate = gate(&store, "1.0.0", &clock);

        let outcome = gate.on_activate().unwrap();
        assert_eq!(outcome.state, GateState::Stale);
        assert!(!outcome.marker_advanced);
        assert!(outcome.routes_refreshed);
        assert_eq!(store.list_routes().unwrap().len(), 2);
        assert!(gate.status().unwrap().guard_active);
    }

    #[test]
    fn status_reports_guard() {
        let store = seeded();
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let gate = gate(&store, "1.0.0", &clock);

        let before = gate.status().unwrap();
        assert_eq!(before.state, GateState::Unknown);
        assert!(before.installed_version.is_none());
        assert!(!before.guard_active);

        gate.on_admin_request().unwrap();
        let after = gate.status().unwrap();
        assert_eq!(after.state, GateState::Current);
        assert!(after.guard_active);
        assert_eq!(after.installed_version.as_deref(), Some("1.0.0"));
    }
}
