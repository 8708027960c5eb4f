use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fleetledger::diff::build_diffs;
use fleetledger::normalize::normalize;
use fleetledger::{EntityKind, FieldType};
use serde_json::{json, Map, Value};
use uuid::Uuid;

fn equipment_snapshot(status: &str, service: &str) -> Map<String, Value> {
    json!({
        "identifying_number": "EQ-204",
        "equipment_type": "Loader",
        "assigned_plant": "plant-7",
        "status": status,
        "last_service_date": service,
        "hours_mileage": 10432,
        "cleanliness_rating": "3",
        "condition_rating": 4,
        "equipment_make": "CAT",
        "equipment_model": "950M",
        "year_made": 2018,
        "is_verified": "true",
    })
    .as_object()
    .cloned()
    .unwrap_or_default()
}

fn bench_normalize_date(c: &mut Criterion) {
    let iso = json!("2024-05-01T00:00:00Z");
    let us = json!("5/1/2024");
    c.bench_function("normalize(Date, iso)", |b| {
        b.iter(|| normalize(FieldType::Date, black_box(&iso)));
    });
    c.bench_function("normalize(Date, m/d/y)", |b| {
        b.iter(|| normalize(FieldType::Date, black_box(&us)));
    });
}

fn bench_normalize_number(c: &mut Criterion) {
    let raw = json!(" 10432.50 ");
    c.bench_function("normalize(Number, padded)", |b| {
        b.iter(|| normalize(FieldType::Number, black_box(&raw)));
    });
}

fn bench_build_diffs_unchanged(c: &mut Criterion) {
    let specs = EntityKind::Equipment.config().fields;
    let old = equipment_snapshot("Active", "2024-05-01");
    let new = equipment_snapshot("Active", "05/01/2024");
    let now = chrono::Utc::now();
    c.bench_function("build_diffs(equipment, unchanged)", |b| {
        b.iter(|| build_diffs(Uuid::nil(), specs, black_box(&old), black_box(&new), "op", now));
    });
}

fn bench_build_diffs_changed(c: &mut Criterion) {
    let specs = EntityKind::Equipment.config().fields;
    let old = equipment_snapshot("Active", "2024-05-01");
    let new = equipment_snapshot("In Shop", "2024-06-01");
    let now = chrono::Utc::now();
    c.bench_function("build_diffs(equipment, 2 changed)", |b| {
        b.iter(|| build_diffs(Uuid::nil(), specs, black_box(&old), black_box(&new), "op", now));
    });
}

criterion_group!(
    benches,
    bench_normalize_date,
    bench_normalize_number,
    bench_build_diffs_unchanged,
    bench_build_diffs_changed,
);
criterion_main!(benches);
