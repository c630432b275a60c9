//! In-process backing store for `tower-sessions`.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};
use time::OffsetDateTime;
use tower_sessions::session::{Id, Record};
use tower_sessions::session_store::{self, SessionStore};

use crate::observability::metrics;

/// Concurrent map of session id to session record. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    records: Arc<DashMap<Id, Record>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evict records whose expiry is at or before `now`. Returns how many were removed.
    pub fn sweep(&self, now: OffsetDateTime) -> usize {
        let before = self.records.len();
        self.records.retain(|_, record| record.expiry_date > now);
        let remaining = self.records.len();
        metrics::record_active_sessions(remaining);
        before.saturating_sub(remaining)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        loop {
            match self.records.entry(record.id) {
                Entry::Occupied(_) => record.id = Id::default(),
                Entry::Vacant(slot) => {
                    slot.insert(record.clone());
                    break;
                }
            }
        }
        metrics::record_active_sessions(self.records.len());
        tracing::debug!(session = %record.id, "Session created");
        Ok(())
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        self.records.insert(record.id, record.clone());
        Ok(())
    }

    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        let now = OffsetDateTime::now_utc();
        Ok(self
            .records
            .get(session_id)
            .filter(|record| record.expiry_date > now)
            .map(|record| record.value().clone()))
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        self.records.remove(session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use time::Duration;

    fn record(expires_in: Duration) -> Record {
        Record {
            id: Id::default(),
            data: HashMap::new(),
            expiry_date: OffsetDateTime::now_utc() + expires_in,
        }
    }

    #[tokio::test]
    async fn test_create_and_load() {
        let store = MemorySessionStore::new();
        let mut live = record(Duration::minutes(5));
        store.create(&mut live).await.unwrap();

        let loaded = store.load(&live.id).await.unwrap();
        assert_eq!(loaded.map(|r| r.id), Some(live.id));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_create_never_overwrites_an_existing_id() {
        let store = MemorySessionStore::new();
        let mut first = record(Duration::minutes(5));
        store.create(&mut first).await.unwrap();

        let mut clash = record(Duration::minutes(5));
        clash.id = first.id;
        store.create(&mut clash).await.unwrap();

        assert_ne!(clash.id, first.id);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_expired_record_is_not_loaded() {
        let store = MemorySessionStore::new();
        let stale = record(Duration::seconds(-1));
        store.save(&stale).await.unwrap();
        assert!(store.load(&stale.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemorySessionStore::new();
        let live = record(Duration::minutes(5));
        store.save(&live).await.unwrap();
        store.delete(&live.id).await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_sweep_evicts_expired_records() {
        let store = MemorySessionStore::new();
        let stale = record(Duration::seconds(-10));
        let fresh = record(Duration::minutes(5));
        store.save(&stale).await.unwrap();
        store.save(&fresh).await.unwrap();

        assert_eq!(store.sweep(OffsetDateTime::now_utc()), 1);
        assert!(store.load(&fresh.id).await.unwrap().is_some());
        assert_eq!(store.len(), 1);
    }
}
