//! # fleetledger: Fleet Asset Records with Field-Level Audit History
//!
//! Equipment, mixers, trailers and pickup trucks share one update path: fetch
//! the current row, merge the change, persist it, then append one history row
//! per tracked field whose normalized value changed.
//!
//! | Module | Role |
//! |--------|------|
//! | [`normalize`] | Canonical forms for comparing raw field values |
//! | [`field`], [`kinds`] | Static FieldSpec tables per entity kind |
//! | [`diff`] | Pure diff builder producing history records |
//! | [`ledger`] | Update-with-history orchestrator and CRUD around it |
//! | [`status`] | Service-overdue and weekly-verification derivation |
//! | [`store`] | Storage seam with Postgres and in-memory backends |
//! | [`api`] | REST surface (axum) |

pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod diff;
pub mod entity;
pub mod error;
pub mod field;
pub mod kinds;
pub mod ledger;
pub mod metrics;
pub mod normalize;
pub mod status;
pub mod store;

pub use entity::{EntityRow, HistoryRecord, HistoryRow, Payload};
pub use error::{LedgerError, StoreError};
pub use field::{FieldSpec, FieldType};
pub use kinds::{EntityConfig, EntityKind};
pub use ledger::{ActorResolver, FleetLedger, NoActor, StaticActor, UpdateOutcome};
pub use normalize::{normalize, Normalized};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering from poisoning.
pub fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
