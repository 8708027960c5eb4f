//! # Prometheus Metrics: Ledger Write Counters
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `fleetledger_updates_total` | Counter | `kind` | Entity writes through the ledger |
//! | `fleetledger_history_rows_total` | Counter | `kind` | History rows appended |
//! | `fleetledger_audit_failures_total` | Counter | `kind` | History batches that failed to persist |
//!
//! The `/metrics` endpoint renders the registry on each scrape.

use crate::kinds::EntityKind;
use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;

#[derive(Clone, Debug, Hash, PartialEq, Eq, prometheus_client::encoding::EncodeLabelSet)]
pub struct KindLabel {
    pub kind: String,
}

impl KindLabel {
    pub fn of(kind: EntityKind) -> Self {
        KindLabel {
            kind: kind.slug().to_string(),
        }
    }
}

/// Counters are atomic and safe to bump from any task.
pub struct Metrics {
    pub registry: Registry,
    pub updates: Family<KindLabel, Counter>,
    pub history_rows: Family<KindLabel, Counter>,
    pub audit_failures: Family<KindLabel, Counter>,
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let updates = Family::<KindLabel, Counter>::default();
        registry.register(
            "fleetledger_updates",
            "Entity writes through the ledger by kind",
            updates.clone(),
        );

        let history_rows = Family::<KindLabel, Counter>::default();
        registry.register(
            "fleetledger_history_rows",
            "History rows appended by kind",
            history_rows.clone(),
        );

        let audit_failures = Family::<KindLabel, Counter>::default();
        registry.register(
            "fleetledger_audit_failures",
            "History batches that failed to persist by kind",
            audit_failures.clone(),
        );

        Self {
            registry,
            updates,
            history_rows,
            audit_failures,
        }
    }

    pub fn record_update(&self, kind: EntityKind) {
        self.updates.get_or_create(&KindLabel::of(kind)).inc();
    }

    pub fn record_history(&self, kind: EntityKind, rows: usize) {
        self.history_rows
            .get_or_create(&KindLabel::of(kind))
            .inc_by(rows as u64);
    }

    pub fn record_audit_failure(&self, kind: EntityKind) {
        self.audit_failures.get_or_create(&KindLabel::of(kind)).inc();
    }

    /// Render all metrics in Prometheus text exposition format.
    pub fn encode(&self) -> String {
        let mut buf = String::new();
        if let Err(e) = encode(&mut buf, &self.registry) {
            tracing::warn!(error = %e, "metrics encoding failed");
        }
        buf
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
