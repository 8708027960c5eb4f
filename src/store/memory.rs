//! In-process store backed by `Mutex<HashMap>`.
//!
//! Mirrors the Postgres schema closely enough for orchestrator tests: rows
//! are keyed by `(table, id)`, history by history table, and only declared
//! columns survive a write. Individual operations can be made to fail.

use super::EntityStore;
use crate::entity::{EntityRow, HistoryRecord, HistoryRow};
use crate::error::{StoreError, StoreResult};
use crate::kinds::EntityConfig;
use crate::lock_or_recover;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Map;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<HashMap<(&'static str, Uuid), EntityRow>>,
    history: Mutex<HashMap<&'static str, Vec<HistoryRow>>>,
    fail_updates: AtomicBool,
    fail_history: AtomicBool,
    fail_reads: AtomicBool,
    writes: AtomicUsize,
    reads: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every entity `update` fail with `Unavailable`.
    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    /// Make every `insert_history` fail with `Unavailable`.
    pub fn fail_history(&self, fail: bool) {
        self.fail_history.store(fail, Ordering::SeqCst);
    }

    /// Make `fetch` and `list` fail with `Unavailable`.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Number of successful write calls (entity and history).
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of `fetch`/`list` calls that reached the store.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Total history rows across all kinds.
    pub fn history_len(&self) -> usize {
        lock_or_recover(&self.history).values().map(Vec::len).sum()
    }

    fn check_reads(&self) -> StoreResult<()> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("reads disabled".into()));
        }
        Ok(())
    }

    /// Drop columns the table does not have, as Postgres would reject them.
    fn project(cfg: &EntityConfig, row: &EntityRow) -> EntityRow {
        let mut fields = Map::new();
        for col in cfg.writable_columns() {
            if let Some(v) = row.fields.get(col) {
                fields.insert(col.to_string(), v.clone());
            }
        }
        EntityRow {
            fields,
            ..row.clone()
        }
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn fetch(&self, cfg: &EntityConfig, id: Uuid) -> StoreResult<Option<EntityRow>> {
        self.check_reads()?;
        Ok(lock_or_recover(&self.rows).get(&(cfg.table, id)).cloned())
    }

    async fn list(&self, cfg: &EntityConfig) -> StoreResult<Vec<EntityRow>> {
        self.check_reads()?;
        let mut rows: Vec<EntityRow> = lock_or_recover(&self.rows)
            .iter()
            .filter(|((table, _), _)| *table == cfg.table)
            .map(|(_, row)| row.clone())
            .collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn insert(&self, cfg: &EntityConfig, row: &EntityRow) -> StoreResult<EntityRow> {
        let stored = Self::project(cfg, row);
        let mut rows = lock_or_recover(&self.rows);
        if rows.contains_key(&(cfg.table, row.id)) {
            return Err(StoreError::Corrupt(format!("duplicate id {}", row.id)));
        }
        rows.insert((cfg.table, row.id), stored.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(stored)
    }

    async fn update(&self, cfg: &EntityConfig, row: &EntityRow) -> StoreResult<Option<EntityRow>> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("entity writes disabled".into()));
        }
        let mut rows = lock_or_recover(&self.rows);
        let Some(existing) = rows.get_mut(&(cfg.table, row.id)) else {
            return Ok(None);
        };
        let stored = EntityRow {
            created_at: existing.created_at,
            ..Self::project(cfg, row)
        };
        *existing = stored.clone();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(Some(stored))
    }

    async fn delete(&self, cfg: &EntityConfig, id: Uuid) -> StoreResult<bool> {
        let removed = lock_or_recover(&self.rows).remove(&(cfg.table, id)).is_some();
        if removed {
            self.writes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(removed)
    }

    async fn insert_history(
        &self,
        cfg: &EntityConfig,
        records: &[HistoryRecord],
    ) -> StoreResult<()> {
        if self.fail_history.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("history writes disabled".into()));
        }
        let mut history = lock_or_recover(&self.history);
        let table = history.entry(cfg.history_table).or_default();
        table.extend(
            records
                .iter()
                .cloned()
                .map(|r| HistoryRow::from_record(Uuid::new_v4(), r)),
        );
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn list_history(&self, cfg: &EntityConfig, id: Uuid) -> StoreResult<Vec<HistoryRow>> {
        let history = lock_or_recover(&self.history);
        let mut rows: Vec<HistoryRow> = history
            .get(cfg.history_table)
            .map(|t| t.iter().filter(|r| r.entity_id == id).cloned().collect())
            .unwrap_or_default();
        // Later inserts first when timestamps tie.
        rows.reverse();
        rows.sort_by(|a, b| b.changed_at.cmp(&a.changed_at));
        Ok(rows)
    }

    async fn delete_history(&self, cfg: &EntityConfig, id: Uuid) -> StoreResult<u64> {
        let mut history = lock_or_recover(&self.history);
        let Some(table) = history.get_mut(cfg.history_table) else {
            return Ok(0);
        };
        let before = table.len();
        table.retain(|r| r.entity_id != id);
        Ok((before - table.len()) as u64)
    }

    async fn latest_history_at(
        &self,
        cfg: &EntityConfig,
        id: Uuid,
    ) -> StoreResult<Option<DateTime<Utc>>> {
        Ok(lock_or_recover(&self.history)
            .get(cfg.history_table)
            .and_then(|t| {
                t.iter()
                    .filter(|r| r.entity_id == id)
                    .map(|r| r.changed_at)
                    .max()
            }))
    }

    async fn health_check(&self) -> StoreResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("reads disabled".into()));
        }
        Ok(())
    }
}
