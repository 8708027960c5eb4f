//! # Ledger: Update-with-History Orchestration
//!
//! [`FleetLedger`] is the one write path for fleet assets. Every kind goes
//! through the same sequence; only the static [`EntityConfig`] differs.
//!
//! ## Update sequence
//!
//! 1. Parse the id, map payload keys to storage columns and canonicalize
//!    typed values. Unknown keys and ledger-owned columns are rejected.
//! 2. Resolve the actor (explicit, else the [`ActorResolver`]).
//! 3. Fetch the current row; absent means `NotFound` and nothing is written.
//! 4. Merge the payload onto a working copy and stamp `updated_at` /
//!    `updated_by`.
//! 5. Persist the working copy. A failure here aborts with `Storage` and no
//!    history is written.
//! 6. Diff the snapshot against the working copy over the kind's FieldSpec
//!    list and append the records in one batch.
//! 7. A failed history append does not undo the entity write: it is logged
//!    with the full diff and returned as
//!    [`UpdateOutcome::UpdatedWithAuditWarning`].
//!
//! The entity write and the history append are separate storage calls with
//! no transaction between them, and nothing is retried. Concurrent updates
//! to one entity are last-writer-wins.
//!
//! ## Read cache
//!
//! `get` and `list` go through a [`ReadCache`]. Every write drops the
//! entity's key and its kind's list key before returning.

use crate::cache::ReadCache;
use crate::clock::{Clock, SystemClock};
use crate::config::{ServiceConfig, Settings};
use crate::diff::build_diffs;
use crate::entity::{EntityRow, HistoryRecord, HistoryRow, Payload, META_COLUMNS, SENTINEL_ACTOR};
use crate::error::{LedgerError, LedgerResult};
use crate::field::{find_spec, FieldType};
use crate::kinds::{EntityConfig, EntityKind};
use crate::metrics::Metrics;
use crate::normalize::{normalize, storage_value};
use crate::status::{EntityStatus, WeekZone};
use crate::store::EntityStore;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Source of the acting user when a caller does not name one.
pub trait ActorResolver: Send + Sync {
    fn current_actor(&self) -> Option<String>;
}

/// Always resolves to the same actor (CLI `--actor`, service accounts).
#[derive(Debug, Clone)]
pub struct StaticActor(pub String);

impl ActorResolver for StaticActor {
    fn current_actor(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Never resolves; callers must pass an actor explicitly.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoActor;

impl ActorResolver for NoActor {
    fn current_actor(&self) -> Option<String> {
        None
    }
}

/// Result of a successful update.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// Entity and history (if any fields changed) both persisted.
    Updated(EntityRow),
    /// The entity was written but its history rows were not.
    UpdatedWithAuditWarning {
        entity: EntityRow,
        diffs: Vec<HistoryRecord>,
        error: String,
    },
}

impl UpdateOutcome {
    pub fn entity(&self) -> &EntityRow {
        match self {
            UpdateOutcome::Updated(entity) => entity,
            UpdateOutcome::UpdatedWithAuditWarning { entity, .. } => entity,
        }
    }

    pub fn into_entity(self) -> EntityRow {
        match self {
            UpdateOutcome::Updated(entity) => entity,
            UpdateOutcome::UpdatedWithAuditWarning { entity, .. } => entity,
        }
    }

    pub fn audit_warning(&self) -> Option<&str> {
        match self {
            UpdateOutcome::Updated(_) => None,
            UpdateOutcome::UpdatedWithAuditWarning { error, .. } => Some(error),
        }
    }
}

pub struct FleetLedger {
    store: Arc<dyn EntityStore>,
    clock: Arc<dyn Clock>,
    actors: Arc<dyn ActorResolver>,
    cache: ReadCache,
    metrics: Arc<Metrics>,
    service: ServiceConfig,
    week_zone: WeekZone,
}

impl FleetLedger {
    /// Ledger over `store` with default settings, the system clock and no
    /// implicit actor.
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        let settings = Settings::default();
        FleetLedger {
            store,
            clock: Arc::new(SystemClock),
            actors: Arc::new(NoActor),
            cache: ReadCache::new(settings.cache_ttl()),
            metrics: Arc::new(Metrics::new()),
            service: settings.service.clone(),
            week_zone: settings.week_zone(),
        }
    }

    pub fn with_settings(mut self, settings: &Settings) -> Self {
        self.cache = ReadCache::new(settings.cache_ttl());
        self.service = settings.service.clone();
        self.week_zone = settings.week_zone();
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_actor_resolver(mut self, actors: Arc<dyn ActorResolver>) -> Self {
        self.actors = actors;
        self
    }

    pub fn with_week_zone(mut self, zone: WeekZone) -> Self {
        self.week_zone = zone;
        self
    }

    pub fn store(&self) -> &Arc<dyn EntityStore> {
        &self.store
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Apply `payload` to the entity and record a history row for every
    /// tracked field whose normalized value changed.
    pub async fn update(
        &self,
        kind: EntityKind,
        id: &str,
        payload: &Payload,
        actor: Option<&str>,
    ) -> LedgerResult<UpdateOutcome> {
        let cfg = kind.config();
        let id = parse_id(id)?;
        let changes = prepare_payload(cfg, payload)?;
        check_required(cfg, &changes, true)?;
        let actor = self.resolve_actor(actor)?;

        let current = self
            .store
            .fetch(cfg, id)
            .await?
            .ok_or(LedgerError::NotFound { kind, id })?;

        let now = self.clock.now();
        let mut working = current.clone();
        working.fields.extend(changes);
        working.stamp(now, &actor);

        let stored = self.store.update(cfg, &working).await;
        // Drop cached reads even on failure; the row state is uncertain.
        self.cache.invalidate(kind, id);
        let entity = stored?.ok_or(LedgerError::NotFound { kind, id })?;
        self.metrics.record_update(kind);

        let diffs = build_diffs(id, cfg.fields, &current.fields, &working.fields, &actor, now);
        if diffs.is_empty() {
            debug!(%kind, %id, %actor, "update changed no tracked fields");
            return Ok(UpdateOutcome::Updated(entity));
        }

        match self.store.insert_history(cfg, &diffs).await {
            Ok(()) => {
                self.metrics.record_history(kind, diffs.len());
                info!(%kind, %id, %actor, changed = diffs.len(), "entity updated");
                Ok(UpdateOutcome::Updated(entity))
            }
            Err(e) => {
                self.metrics.record_audit_failure(kind);
                let diff_json = serde_json::to_string(&diffs).unwrap_or_default();
                error!(
                    %kind,
                    entity_id = %id,
                    %actor,
                    diff = %diff_json,
                    error = %e,
                    "history write failed; entity update kept"
                );
                Ok(UpdateOutcome::UpdatedWithAuditWarning {
                    entity,
                    diffs,
                    error: e.to_string(),
                })
            }
        }
    }

    /// Insert a new entity. Creation records no history rows.
    pub async fn create(
        &self,
        kind: EntityKind,
        payload: &Payload,
        actor: Option<&str>,
    ) -> LedgerResult<EntityRow> {
        let cfg = kind.config();
        let fields = prepare_payload(cfg, payload)?;
        check_required(cfg, &fields, false)?;
        let actor = self.resolve_actor(actor)?;

        let now = self.clock.now();
        let mut row = EntityRow::new(Uuid::new_v4());
        row.created_at = Some(now);
        row.fields = fields;
        row.stamp(now, &actor);

        let stored = self.store.insert(cfg, &row).await?;
        self.cache.invalidate(kind, stored.id);
        self.metrics.record_update(kind);
        info!(%kind, id = %stored.id, %actor, "entity created");
        Ok(stored)
    }

    pub async fn get(&self, kind: EntityKind, id: &str) -> LedgerResult<EntityRow> {
        let id = parse_id(id)?;
        if let Some(row) = self.cache.get(kind, id) {
            return Ok(row);
        }
        let row = self
            .store
            .fetch(kind.config(), id)
            .await?
            .ok_or(LedgerError::NotFound { kind, id })?;
        self.cache.put(kind, &row);
        Ok(row)
    }

    /// Every entity of `kind`, oldest first.
    pub async fn list(&self, kind: EntityKind) -> LedgerResult<Vec<EntityRow>> {
        if let Some(rows) = self.cache.get_list(kind) {
            return Ok(rows);
        }
        let rows = self.store.list(kind.config()).await?;
        self.cache.put_list(kind, &rows);
        Ok(rows)
    }

    /// History rows for one entity, newest first.
    pub async fn history(&self, kind: EntityKind, id: &str) -> LedgerResult<Vec<HistoryRow>> {
        let cfg = kind.config();
        let id = parse_id(id)?;
        let rows = self.store.list_history(cfg, id).await?;
        if rows.is_empty() && self.store.fetch(cfg, id).await?.is_none() {
            return Err(LedgerError::NotFound { kind, id });
        }
        Ok(rows)
    }

    /// Delete an entity and its history. History goes first so no row is
    /// ever left pointing at a missing entity.
    pub async fn delete(&self, kind: EntityKind, id: &str) -> LedgerResult<()> {
        let cfg = kind.config();
        let id = parse_id(id)?;
        if self.store.fetch(cfg, id).await?.is_none() {
            return Err(LedgerError::NotFound { kind, id });
        }
        let removed_history = self.store.delete_history(cfg, id).await?;
        let deleted = self.store.delete(cfg, id).await;
        self.cache.invalidate(kind, id);
        if !deleted? {
            return Err(LedgerError::NotFound { kind, id });
        }
        info!(%kind, %id, removed_history, "entity deleted");
        Ok(())
    }

    /// Record the weekly verification: stamps `updated_last`, `updated_at`
    /// and `updated_by` without touching tracked fields or history.
    pub async fn verify(
        &self,
        kind: EntityKind,
        id: &str,
        actor: Option<&str>,
    ) -> LedgerResult<EntityRow> {
        let cfg = kind.config();
        let id = parse_id(id)?;
        let actor = self.resolve_actor(actor)?;

        let mut row = self
            .store
            .fetch(cfg, id)
            .await?
            .ok_or(LedgerError::NotFound { kind, id })?;
        let now = self.clock.now();
        row.stamp(now, &actor);
        row.updated_last = Some(now);

        let stored = self.store.update(cfg, &row).await;
        self.cache.invalidate(kind, id);
        let stored = stored?.ok_or(LedgerError::NotFound { kind, id })?;
        self.metrics.record_update(kind);
        info!(%kind, %id, %actor, "entity verified");
        Ok(stored)
    }

    /// Service-overdue and weekly-verification flags as of now.
    pub async fn status(&self, kind: EntityKind, id: &str) -> LedgerResult<EntityStatus> {
        let row = self.get(kind, id).await?;
        let latest = self.store.latest_history_at(kind.config(), row.id).await?;
        Ok(EntityStatus::derive(
            &row,
            self.service.threshold_days(kind),
            latest,
            self.clock.now(),
            self.week_zone,
        ))
    }

    /// Explicit actor, else the resolver's. A blank actor is recorded as the
    /// sentinel id.
    fn resolve_actor(&self, explicit: Option<&str>) -> LedgerResult<String> {
        let actor = match explicit {
            Some(a) => a.to_string(),
            None => self
                .actors
                .current_actor()
                .ok_or(LedgerError::AuthenticationRequired)?,
        };
        if actor.trim().is_empty() {
            Ok(SENTINEL_ACTOR.to_string())
        } else {
            Ok(actor)
        }
    }
}

fn parse_id(id: &str) -> LedgerResult<Uuid> {
    Uuid::parse_str(id.trim()).map_err(|_| LedgerError::invalid(format!("malformed id '{}'", id)))
}

/// Map payload keys to storage columns and canonicalize typed values.
fn prepare_payload(cfg: &EntityConfig, payload: &Payload) -> LedgerResult<Map<String, Value>> {
    let mut out = Map::new();
    for (key, raw) in payload {
        if META_COLUMNS.contains(&key.as_str()) {
            return Err(LedgerError::invalid(format!(
                "'{}' is maintained by the ledger",
                key
            )));
        }
        let column = cfg.resolve_column(key).ok_or_else(|| {
            LedgerError::invalid(format!("unknown field '{}' for {}", key, cfg.kind))
        })?;
        let field_type = find_spec(cfg.fields, column).map_or(FieldType::Text, |s| s.field_type);
        let value = storage_value(field_type, raw).ok_or_else(|| {
            LedgerError::invalid(format!("'{}' is not a valid {}: {}", key, field_type, raw))
        })?;
        out.insert(column.to_string(), value);
    }
    Ok(out)
}

/// Reject blank required columns. A partial payload only checks the
/// required columns it actually carries.
fn check_required(
    cfg: &EntityConfig,
    fields: &Map<String, Value>,
    partial: bool,
) -> LedgerResult<()> {
    for column in cfg.required {
        let value = match fields.get(*column) {
            Some(value) => value,
            None if partial => continue,
            None => &Value::Null,
        };
        if normalize(FieldType::Text, value).is_null() {
            return Err(LedgerError::invalid(format!(
                "'{}' is required for {}",
                column, cfg.kind
            )));
        }
    }
    Ok(())
}
