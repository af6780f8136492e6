//! Store wrapper that counts mutating calls and injects failures

use folio::storage::{AdminStore, ClassificationStore, Route, StorageError, StorageResult};
use folio::{CanonicalSchema, GroupName, ItemId, NewTerm, Term, TermRef};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Delegates to `inner`, recording every call that could mutate state.
///
/// `mutations` counts calls to mutating methods whatever their outcome;
/// `effective_writes` counts only terms actually created and tags
/// actually added.
pub struct CountingStore<S> {
    inner: S,
    mutations: AtomicUsize,
    effective_writes: AtomicUsize,
    fail_register: AtomicBool,
    /// Number of upcoming lookups that pretend the term does not exist yet
    stale_finds: AtomicUsize,
    fail_listing: Mutex<HashSet<TermRef>>,
}

impl<S: AdminStore> CountingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            mutations: AtomicUsize::new(0),
            effective_writes: AtomicUsize::new(0),
            fail_register: AtomicBool::new(false),
            stale_finds: AtomicUsize::new(0),
            fail_listing: Mutex::new(HashSet::new()),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn mutations(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    pub fn effective_writes(&self) -> usize {
        self.effective_writes.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.mutations.store(0, Ordering::SeqCst);
        self.effective_writes.store(0, Ordering::SeqCst);
    }

    pub fn fail_register_schema(&self, fail: bool) {
        self.fail_register.store(fail, Ordering::SeqCst);
    }

    /// Make the next `n` lookups miss, as if a concurrent run had not yet
    /// committed its term when this run checked
    pub fn stale_finds(&self, n: usize) {
        self.stale_finds.store(n, Ordering::SeqCst);
    }

    /// Make listing the items tagged with `term` fail with a store error
    pub fn fail_listing_for(&self, term: TermRef) {
        self.fail_listing.lock().unwrap().insert(term);
    }

    fn mutated(&self) {
        self.mutations.fetch_add(1, Ordering::SeqCst);
    }

    fn wrote(&self) {
        self.effective_writes.fetch_add(1, Ordering::SeqCst);
    }
}

impl<S: AdminStore> ClassificationStore for CountingStore<S> {
    fn list_terms(&self, group: &GroupName) -> StorageResult<Vec<Term>> {
        self.inner.list_terms(group)
    }

    fn find_term_by_name(&self, group: &GroupName, name: &str) -> StorageResult<Option<Term>> {
        let stale = self
            .stale_finds
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if stale {
            return Ok(None);
        }
        self.inner.find_term_by_name(group, name)
    }

    fn create_term(&self, group: &GroupName, term: &NewTerm) -> StorageResult<Term> {
        self.mutated();
        let created = self.inner.create_term(group, term)?;
        self.wrote();
        Ok(created)
    }

    fn list_items_tagged(&self, group: &GroupName, term: TermRef) -> StorageResult<Vec<ItemId>> {
        if self.fail_listing.lock().unwrap().contains(&term) {
            return Err(StorageError::Invalid(format!("listing {} rejected", term)));
        }
        self.inner.list_items_tagged(group, term)
    }

    fn add_tag(&self, item: &ItemId, group: &GroupName, term: TermRef) -> StorageResult<bool> {
        self.mutated();
        let added = self.inner.add_tag(item, group, term)?;
        if added {
            self.wrote();
        }
        Ok(added)
    }

    fn get_marker(&self, key: &str) -> StorageResult<Option<String>> {
        self.inner.get_marker(key)
    }

    fn set_marker(&self, key: &str, value: &str) -> StorageResult<()> {
        self.mutated();
        self.inner.set_marker(key, value)
    }

    fn register_schema(&self, schema: &CanonicalSchema) -> StorageResult<()> {
        self.mutated();
        if self.fail_register.load(Ordering::SeqCst) {
            return Err(StorageError::Invalid("schema registration rejected".to_string()));
        }
        self.inner.register_schema(schema)
    }

    fn refresh_routes(&self) -> StorageResult<usize> {
        self.mutated();
        self.inner.refresh_routes()
    }
}

impl<S: AdminStore> AdminStore for CountingStore<S> {
    fn ensure_group(&self, group: &GroupName, label: &str) -> StorageResult<bool> {
        self.mutated();
        self.inner.ensure_group(group, label)
    }

    fn list_groups(&self) -> StorageResult<Vec<(GroupName, String)>> {
        self.inner.list_groups()
    }

    fn tags_of(&self, item: &ItemId) -> StorageResult<Vec<(GroupName, Term)>> {
        self.inner.tags_of(item)
    }

    fn list_routes(&self) -> StorageResult<Vec<Route>> {
        self.inner.list_routes()
    }
}
