//! Time-boxed guard against redundant route-table refreshes
//!
//! The guard is a marker whose value is its RFC 3339 expiry instant. A
//! missing, expired or unparseable value means the guard is down.

use crate::storage::{ClassificationStore, StorageResult};
use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone)]
pub struct RefreshGuard {
    key: String,
    window: Duration,
}

impl RefreshGuard {
    pub fn new(key: impl Into<String>, window: Duration) -> Self {
        Self {
            key: key.into(),
            window,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Expiry instant currently stored, if any
    pub fn expires_at(&self, store: &dyn ClassificationStore) -> StorageResult<Option<DateTime<Utc>>> {
        Ok(store
            .get_marker(&self.key)?
            .and_then(|value| DateTime::parse_from_rfc3339(&value).ok())
            .map(|at| at.with_timezone(&Utc)))
    }

    pub fn is_active(&self, store: &dyn ClassificationStore, now: DateTime<Utc>) -> StorageResult<bool> {
        Ok(self.expires_at(store)?.is_some_and(|at| at > now))
    }

    /// Raise the guard for one window starting at `now`
    pub fn arm(&self, store: &dyn ClassificationStore, now: DateTime<Utc>) -> StorageResult<DateTime<Utc>> {
        let expires = now + self.window;
        store.set_marker(&self.key, &expires.to_rfc3339())?;
        Ok(expires)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn guard_is_down_until_armed() {
        let store = MemoryStore::new();
        let guard = RefreshGuard::new("flush", Duration::minutes(10));
        let now = Utc::now();

        assert!(!guard.is_active(&store, now).unwrap());
        guard.arm(&store, now).unwrap();
        assert!(guard.is_active(&store, now + Duration::minutes(9)).unwrap());
        assert!(!guard.is_active(&store, now + Duration::minutes(10)).unwrap());
    }

    #[test]
    fn garbage_value_counts_as_expired() {
        let store = MemoryStore::new();
        store.set_marker("flush", "yes").unwrap();
        let guard = RefreshGuard::new("flush", Duration::minutes(10));
        assert!(!guard.is_active(&store, Utc::now()).unwrap());
        assert!(guard.expires_at(&store).unwrap().is_none());
    }
}
