//! # Store: Entity and History Persistence
//!
//! [`EntityStore`] is the seam between the ledger and its backing tables. Each
//! method is one storage round trip; the ledger composes them and decides
//! what a failure means.
//!
//! ## Implementations
//!
//! - [`PgStore`]: PostgreSQL via `sqlx::PgPool`. One generic set of queries
//!   serves every entity kind by reading rows with `to_jsonb(row)` and writing
//!   them with `jsonb_populate_record`.
//! - [`MemoryStore`]: in-process maps with failure injection, used by tests
//!   and by the `--memory` server mode.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::entity::{EntityRow, HistoryRecord, HistoryRow};
use crate::error::StoreResult;
use crate::kinds::EntityConfig;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[async_trait]
pub trait EntityStore: Send + Sync {
    /// `select by id`.
    async fn fetch(&self, cfg: &EntityConfig, id: Uuid) -> StoreResult<Option<EntityRow>>;

    /// All rows of a kind, oldest first.
    async fn list(&self, cfg: &EntityConfig) -> StoreResult<Vec<EntityRow>>;

    async fn insert(&self, cfg: &EntityConfig, row: &EntityRow) -> StoreResult<EntityRow>;

    /// `update by id`, writing every writable and bookkeeping column.
    /// Returns `None` if the row vanished.
    async fn update(&self, cfg: &EntityConfig, row: &EntityRow) -> StoreResult<Option<EntityRow>>;

    /// Returns true if a row was deleted.
    async fn delete(&self, cfg: &EntityConfig, id: Uuid) -> StoreResult<bool>;

    /// Batch append to the kind's history table.
    async fn insert_history(&self, cfg: &EntityConfig, records: &[HistoryRecord])
        -> StoreResult<()>;

    /// History rows for one entity, newest first.
    async fn list_history(&self, cfg: &EntityConfig, id: Uuid) -> StoreResult<Vec<HistoryRow>>;

    /// Returns the number of rows removed.
    async fn delete_history(&self, cfg: &EntityConfig, id: Uuid) -> StoreResult<u64>;

    async fn latest_history_at(
        &self,
        cfg: &EntityConfig,
        id: Uuid,
    ) -> StoreResult<Option<DateTime<Utc>>>;

    /// Connectivity check backing `/readyz`.
    async fn health_check(&self) -> StoreResult<()>;
}
