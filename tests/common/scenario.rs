//! The two-legacy-group portfolio scenario
//!
//! `murals_category` holds Sunset and Portrait, `design_category` holds
//! Portrait and Logo. Item A is tagged Sunset in murals; item B is tagged
//! Portrait in both legacy groups. The canonical group starts empty.

use chrono::Duration;
use folio::seed::Fixture;
use folio::storage::{AdminStore, ClassificationStore};
use folio::{CanonicalSchema, GateSettings, GroupName, ItemId, MemoryStore};
use std::collections::BTreeSet;

pub const SCENARIO: &str = r#"
groups:
  - name: portfolio_category
    label: Portfolio Categories
  - name: murals_category
    label: Murals
    terms:
      - name: Sunset
        description: Warm palettes
        items: [A]
      - name: Portrait
        items: [B]
  - name: design_category
    label: Design
    terms:
      - name: Portrait
        description: Faces and figures
        items: [B]
      - name: Logo
"#;

pub fn canonical() -> GroupName {
    GroupName::from("portfolio_category")
}

pub fn murals() -> GroupName {
    GroupName::from("murals_category")
}

pub fn design() -> GroupName {
    GroupName::from("design_category")
}

/// Load the scenario into any admin-capable store
pub fn seed_scenario(store: &dyn AdminStore) {
    Fixture::from_yaml(SCENARIO)
        .expect("scenario fixture parses")
        .apply(store)
        .expect("scenario fixture applies");
}

pub fn scenario_store() -> MemoryStore {
    let store = MemoryStore::new();
    seed_scenario(&store);
    store
}

pub fn gate_settings(version: &str, legacy_groups: Vec<GroupName>) -> GateSettings {
    GateSettings {
        version: version.to_string(),
        version_marker_key: "folio_version".to_string(),
        refresh_guard_key: "folio_flush_routes".to_string(),
        refresh_window: Duration::hours(1),
        schema: CanonicalSchema::new(canonical(), "Portfolio Categories", "portfolio-category"),
        legacy_groups,
    }
}

/// Term names of a group, sorted
pub fn names_in(store: &dyn AdminStore, group: &GroupName) -> Vec<String> {
    let mut names: Vec<String> = store
        .list_terms(group)
        .expect("group exists")
        .into_iter()
        .map(|t| t.name)
        .collect();
    names.sort();
    names
}

/// Names of the terms `item` carries in `group`
pub fn tagged_in(store: &dyn AdminStore, item: &str, group: &GroupName) -> BTreeSet<String> {
    store
        .tags_of(&ItemId::from(item))
        .expect("tags readable")
        .into_iter()
        .filter(|(g, _)| g == group)
        .map(|(_, term)| term.name)
        .collect()
}
