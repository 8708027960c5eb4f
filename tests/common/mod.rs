//! Shared test helpers for integration tests.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use fleetledger::clock::FixedClock;
use fleetledger::store::{MemoryStore, PgStore};
use fleetledger::{FleetLedger, Payload};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Returns the test database URL from the `TEST_DATABASE_URL` environment variable.
/// Panics if the variable is not set.
pub fn test_db_url() -> String {
    std::env::var("TEST_DATABASE_URL")
        .expect("TEST_DATABASE_URL must be set for integration tests")
}

/// Returns true if the test database URL is configured.
pub fn has_test_db() -> bool {
    std::env::var("TEST_DATABASE_URL").is_ok()
}

/// One-time schema initialization.
static SCHEMA_INIT: OnceCell<()> = OnceCell::const_new();

/// Ensure the fleet tables exist (applies the schema once per test binary).
pub async fn ensure_schema() {
    SCHEMA_INIT
        .get_or_init(|| async {
            let store = PgStore::connect(&test_db_url()).await.unwrap();
            store.apply_schema().await.unwrap();
        })
        .await;
}

/// Connect to the test database with empty fleet tables.
pub async fn setup_test_db() -> PgStore {
    ensure_schema().await;
    let store = PgStore::connect(&test_db_url())
        .await
        .expect("Failed to connect to test database");
    truncate_all_tables(store.pool()).await;
    store
}

/// Truncate all tables to ensure test isolation.
pub async fn truncate_all_tables(pool: &sqlx::PgPool) {
    sqlx::raw_sql(
        "TRUNCATE TABLE equipment_history, mixer_history, trailer_history,
                        pickup_truck_history, equipment, mixers, trailers, pickup_trucks
         CASCADE",
    )
    .execute(pool)
    .await
    .unwrap();
}

/// Wednesday 2024-06-05 15:00 UTC.
pub fn wednesday() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 5, 15, 0, 0).unwrap()
}

pub fn payload(v: serde_json::Value) -> Payload {
    v.as_object().cloned().expect("payload must be a JSON object")
}

/// Ledger over a fresh in-memory store with a fixed clock at [`wednesday`]
/// and the week boundary in UTC.
pub fn memory_ledger() -> (FleetLedger, Arc<MemoryStore>, Arc<FixedClock>) {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(FixedClock::new(wednesday()));
    let ledger = FleetLedger::new(store.clone())
        .with_clock(clock.clone())
        .with_week_zone(fleetledger::status::WeekZone::from_offset_minutes(0).unwrap());
    (ledger, store, clock)
}
