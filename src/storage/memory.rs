//! In-memory storage backend
//!
//! Same contract as `SqliteStore`, without persistence. Used by tests
//! and embedders; failures can be injected per term name or per item.

use super::traits::{
    AdminStore, ClassificationStore, Route, StorageError, StorageResult,
};
use crate::taxonomy::{CanonicalSchema, GroupName, ItemId, NewTerm, Term, TermRef};
use dashmap::{DashMap, DashSet};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Mutex;

#[derive(Debug, Default)]
struct GroupEntry {
    label: String,
    schema: Option<CanonicalSchema>,
    /// Terms in creation order
    terms: Vec<Term>,
    tags: HashMap<TermRef, BTreeSet<ItemId>>,
}

/// DashMap-backed classification store
#[derive(Debug)]
pub struct MemoryStore {
    groups: DashMap<GroupName, GroupEntry>,
    markers: DashMap<String, String>,
    routes: Mutex<BTreeMap<String, String>>,
    next_id: AtomicI64,
    fail_create: DashSet<String>,
    fail_tag: DashSet<ItemId>,
    unavailable: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            groups: DashMap::new(),
            markers: DashMap::new(),
            routes: Mutex::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
            fail_create: DashSet::new(),
            fail_tag: DashSet::new(),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Make `create_term` fail with a store error for this term name
    pub fn fail_create_for(&self, name: impl Into<String>) {
        self.fail_create.insert(name.into());
    }

    /// Make `add_tag` fail with a store error for this item
    pub fn fail_tag_for(&self, item: ItemId) {
        self.fail_tag.insert(item);
    }

    /// Simulate the whole store going away (or coming back)
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> StorageResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StorageError::Unavailable("memory store offline".to_string()))
        } else {
            Ok(())
        }
    }
}

impl ClassificationStore for MemoryStore {
    fn list_terms(&self, group: &GroupName) -> StorageResult<Vec<Term>> {
        self.check_available()?;
        self.groups
            .get(group)
            .map(|entry| entry.terms.clone())
            .ok_or_else(|| StorageError::NotFound(group.clone()))
    }

    fn find_term_by_name(&self, group: &GroupName, name: &str) -> StorageResult<Option<Term>> {
        self.check_available()?;
        Ok(self
            .groups
            .get(group)
            .and_then(|entry| entry.terms.iter().find(|t| t.name == name).cloned()))
    }

    fn create_term(&self, group: &GroupName, term: &NewTerm) -> StorageResult<Term> {
        self.check_available()?;
        if term.name.is_empty() {
            return Err(StorageError::Invalid("term name must not be empty".to_string()));
        }
        if self.fail_create.contains(&term.name) {
            return Err(StorageError::Invalid(format!(
                "injected create failure for {}",
                term.name
            )));
        }

        let mut entry = self
            .groups
            .get_mut(group)
            .ok_or_else(|| StorageError::NotFound(group.clone()))?;
        if entry.terms.iter().any(|t| t.name == term.name) {
            return Err(StorageError::Conflict {
                group: group.clone(),
                name: term.name.clone(),
            });
        }

        let created = Term {
            id: TermRef::from_raw(self.next_id.fetch_add(1, Ordering::SeqCst)),
            group: group.clone(),
            name: term.name.clone(),
            slug: term.slug.clone(),
            description: term.description.clone(),
        };
        entry.terms.push(created.clone());
        Ok(created)
    }

    fn list_items_tagged(&self, group: &GroupName, term: TermRef) -> StorageResult<Vec<ItemId>> {
        self.check_available()?;
        Ok(self
            .groups
            .get(group)
            .and_then(|entry| entry.tags.get(&term).map(|items| items.iter().cloned().collect()))
            .unwrap_or_default())
    }

    fn add_tag(&self, item: &ItemId, group: &GroupName, term: TermRef) -> StorageResult<bool> {
        self.check_available()?;
        if self.fail_tag.contains(item) {
            return Err(StorageError::Invalid(format!("injected tag failure for {}", item)));
        }

        let mut entry = self
            .groups
            .get_mut(group)
            .ok_or_else(|| StorageError::NotFound(group.clone()))?;
        if !entry.terms.iter().any(|t| t.id == term) {
            return Err(StorageError::Invalid(format!("{} is not a term of {}", term, group)));
        }
        Ok(entry.tags.entry(term).or_default().insert(item.clone()))
    }

    fn get_marker(&self, key: &str) -> StorageResult<Option<String>> {
        self.check_available()?;
        Ok(self.markers.get(key).map(|v| v.clone()))
    }

    fn set_marker(&self, key: &str, value: &str) -> StorageResult<()> {
        self.check_available()?;
        self.markers.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn register_schema(&self, schema: &CanonicalSchema) -> StorageResult<()> {
        self.check_available()?;
        let mut entry = self.groups.entry(schema.group.clone()).or_default();
        entry.label = schema.label.clone();
        entry.schema = Some(schema.clone());
        Ok(())
    }

    fn refresh_routes(&self) -> StorageResult<usize> {
        self.check_available()?;
        let mut table = BTreeMap::new();
        for entry in self.groups.iter() {
            let Some(schema) = entry.schema.as_ref() else {
                continue;
            };
            for term in &entry.terms {
                for pattern in &schema.routes {
                    let (path, query) = pattern.expand(&term.slug);
                    table.insert(path, query);
                }
            }
        }

        let written = table.len();
        let mut routes = self
            .routes
            .lock()
            .map_err(|_| StorageError::Unavailable("route table mutex poisoned".to_string()))?;
        *routes = table;
        Ok(written)
    }
}

impl AdminStore for MemoryStore {
    fn ensure_group(&self, group: &GroupName, label: &str) -> StorageResult<bool> {
        self.check_available()?;
        if self.groups.contains_key(group) {
            return Ok(false);
        }
        let mut created = false;
        self.groups.entry(group.clone()).or_insert_with(|| {
            created = true;
            GroupEntry {
                label: label.to_string(),
                ..GroupEntry::default()
            }
        });
        Ok(created)
    }

    fn list_groups(&self) -> StorageResult<Vec<(GroupName, String)>> {
        self.check_available()?;
        let mut groups: Vec<(GroupName, String)> = self
            .groups
            .iter()
            .map(|e| (e.key().clone(), e.label.clone()))
            .collect();
        groups.sort();
        Ok(groups)
    }

    fn tags_of(&self, item: &ItemId) -> StorageResult<Vec<(GroupName, Term)>> {
        self.check_available()?;
        let mut tags = Vec::new();
        for entry in self.groups.iter() {
            for term in &entry.terms {
                if entry.tags.get(&term.id).is_some_and(|items| items.contains(item)) {
                    tags.push((entry.key().clone(), term.clone()));
                }
            }
        }
        tags.sort_by(|a, b| (&a.0, &a.1.name).cmp(&(&b.0, &b.1.name)));
        Ok(tags)
    }

    fn list_routes(&self) -> StorageResult<Vec<Route>> {
        self.check_available()?;
        let routes = self
            .routes
            .lock()
            .map_err(|_| StorageError::Unavailable("route table mutex poisoned".to_string()))?;
        Ok(routes
            .iter()
            .map(|(path, query)| Route {
                path: path.clone(),
                query: query.clone(),
            })
            .collect())
    }
}
