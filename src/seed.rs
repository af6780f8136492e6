//! Fixture loading for operators and tests
//!
//! Describes pre-existing taxonomies, terms and item tags in YAML and
//! writes them into a store. Applying the same fixture twice is a no-op.
//!
//! ```yaml
//! groups:
//!   - name: murals_category
//!     label: Murals
//!     terms:
//!       - name: Sunset
//!         description: Warm palettes
//!         items: [A]
//! ```

use crate::storage::{AdminStore, StorageError, StorageResult};
use crate::taxonomy::{GroupName, ItemId, NewTerm};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub groups: Vec<FixtureGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureGroup {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub terms: Vec<FixtureTerm>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureTerm {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub items: Vec<String>,
}

/// Counts of what a fixture actually added
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub groups_created: usize,
    pub terms_created: usize,
    pub tags_added: usize,
}

impl Fixture {
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    pub fn apply(&self, store: &dyn AdminStore) -> StorageResult<SeedReport> {
        let mut report = SeedReport::default();
        for group in &self.groups {
            let name = GroupName::new(group.name.clone());
            let label = group.label.as_deref().unwrap_or(&group.name);
            if store.ensure_group(&name, label)? {
                report.groups_created += 1;
            }

            for fixture_term in &group.terms {
                let term = match store.find_term_by_name(&name, &fixture_term.name)? {
                    Some(term) => term,
                    None => {
                        let mut new_term = NewTerm::new(fixture_term.name.clone())
                            .with_description(fixture_term.description.clone());
                        if let Some(slug) = &fixture_term.slug {
                            new_term = new_term.with_slug(slug.clone());
                        }
                        match store.create_term(&name, &new_term) {
                            Ok(term) => {
                                report.terms_created += 1;
                                term
                            }
                            Err(StorageError::Conflict { .. }) => store
                                .find_term_by_name(&name, &fixture_term.name)?
                                .ok_or_else(|| {
                                    StorageError::Invalid(format!(
                                        "term {} vanished during seeding",
                                        fixture_term.name
                                    ))
                                })?,
                            Err(err) => return Err(err),
                        }
                    }
                };

                for item in &fixture_term.items {
                    if store.add_tag(&ItemId::new(item.clone()), &name, term.id)? {
                        report.tags_added += 1;
                    }
                }
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{ClassificationStore, MemoryStore};

    const FIXTURE: &str = r#"
groups:
  - name: murals_category
    label: Murals
    terms:
      - name: Sunset
        slug: sunset-wall
        description: Warm palettes
        items: [A]
      - name: Portrait
        items: [B]
  - name: design_category
    terms:
      - name: Portrait
        items: [B]
      - name: Logo
"#;

    #[test]
    fn applies_groups_terms_and_tags() {
        let store = MemoryStore::new();
        let fixture = Fixture::from_yaml(FIXTURE).unwrap();
        let report = fixture.apply(&store).unwrap();

        assert_eq!(
            report,
            SeedReport {
                groups_created: 2,
                terms_created: 4,
                tags_added: 3,
            }
        );
        let sunset = store
            .find_term_by_name(&GroupName::from("murals_category"), "Sunset")
            .unwrap()
            .unwrap();
        assert_eq!(sunset.slug, "sunset-wall");
        assert_eq!(sunset.description, "Warm palettes");
    }

    #[test]
    fn reapplying_adds_nothing() {
        let store = MemoryStore::new();
        let fixture = Fixture::from_yaml(FIXTURE).unwrap();
        fixture.apply(&store).unwrap();

        assert_eq!(fixture.apply(&store).unwrap(), SeedReport::default());
    }

    #[test]
    fn missing_slug_is_derived() {
        let store = MemoryStore::new();
        Fixture::from_yaml(FIXTURE).unwrap().apply(&store).unwrap();
        let logo = store
            .find_term_by_name(&GroupName::from("design_category"), "Logo")
            .unwrap()
            .unwrap();
        assert_eq!(logo.slug, "logo");
    }
}
