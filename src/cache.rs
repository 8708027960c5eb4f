//! # Read Cache: Fixed-TTL Snapshots of Entity Reads
//!
//! Overview pages poll `get` and `list` far more often than anything is
//! written. The ledger keeps the last result of each read here for a fixed
//! TTL and drops the affected keys on every write before returning, so a
//! caller never reads its own write stale.
//!
//! Keys are per kind: one slot per entity id and one slot for the kind's full
//! list. A zero TTL disables caching.

use crate::entity::EntityRow;
use crate::kinds::EntityKind;
use crate::lock_or_recover;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum CacheKey {
    Entity(EntityKind, Uuid),
    List(EntityKind),
}

#[derive(Clone)]
enum Cached {
    Entity(EntityRow),
    List(Vec<EntityRow>),
}

struct Entry {
    value: Cached,
    stored_at: Instant,
}

pub struct ReadCache {
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, Entry>>,
}

impl ReadCache {
    pub fn new(ttl: Duration) -> Self {
        ReadCache {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn get(&self, kind: EntityKind, id: Uuid) -> Option<EntityRow> {
        match self.lookup(CacheKey::Entity(kind, id))? {
            Cached::Entity(row) => Some(row),
            Cached::List(_) => None,
        }
    }

    pub fn put(&self, kind: EntityKind, row: &EntityRow) {
        self.store(CacheKey::Entity(kind, row.id), Cached::Entity(row.clone()));
    }

    pub fn get_list(&self, kind: EntityKind) -> Option<Vec<EntityRow>> {
        match self.lookup(CacheKey::List(kind))? {
            Cached::List(rows) => Some(rows),
            Cached::Entity(_) => None,
        }
    }

    pub fn put_list(&self, kind: EntityKind, rows: &[EntityRow]) {
        self.store(CacheKey::List(kind), Cached::List(rows.to_vec()));
    }

    /// Drop the entity's slot and its kind's list slot.
    pub fn invalidate(&self, kind: EntityKind, id: Uuid) {
        let mut entries = lock_or_recover(&self.entries);
        entries.remove(&CacheKey::Entity(kind, id));
        entries.remove(&CacheKey::List(kind));
    }

    pub fn len(&self) -> usize {
        lock_or_recover(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, key: CacheKey) -> Option<Cached> {
        if self.ttl.is_zero() {
            return None;
        }
        let mut entries = lock_or_recover(&self.entries);
        let fresh = entries.get(&key)?.stored_at.elapsed() < self.ttl;
        if !fresh {
            entries.remove(&key);
            return None;
        }
        entries.get(&key).map(|e| e.value.clone())
    }

    fn store(&self, key: CacheKey, value: Cached) {
        if self.ttl.is_zero() {
            return;
        }
        lock_or_recover(&self.entries).insert(
            key,
            Entry {
                value,
                stored_at: Instant::now(),
            },
        );
    }
}
