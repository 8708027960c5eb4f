//! # Entity Kinds: Per-Asset Field Tables and Storage Layout
//!
//! The four audit-tracked asset kinds share one orchestrator and differ only
//! in the static [`EntityConfig`] declared here: table names, the history
//! foreign key, the tracked [`FieldSpec`] list, writable untracked columns,
//! the columns required on create, and the default service-overdue threshold.
//!
//! | Kind | Table | History table | Overdue after |
//! |------|-------|---------------|---------------|
//! | Equipment | `equipment` | `equipment_history` | 90 days |
//! | Mixer | `mixers` | `mixer_history` | 90 days |
//! | Trailer | `trailers` | `trailer_history` | 90 days |
//! | Pickup truck | `pickup_trucks` | `pickup_truck_history` | 30 days |

use crate::field::{find_spec, FieldSpec, FieldType};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use FieldType::{Boolean, Date, Number, Reference, Text};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Equipment,
    Mixer,
    Trailer,
    PickupTruck,
}

/// Static storage and audit configuration for one entity kind.
#[derive(Debug)]
pub struct EntityConfig {
    pub kind: EntityKind,
    pub table: &'static str,
    pub history_table: &'static str,
    /// Foreign-key column in the history table (`<entity>_id`).
    pub history_fk: &'static str,
    pub fields: &'static [FieldSpec],
    /// Writable columns whose changes are not recorded.
    pub untracked: &'static [&'static str],
    /// Columns that must be present and non-blank on create.
    pub required: &'static [&'static str],
    pub service_threshold_days: i64,
}

const EQUIPMENT_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("identifyingNumber", "identifying_number", Text),
    FieldSpec::new("equipmentType", "equipment_type", Text),
    FieldSpec::new("assignedPlant", "assigned_plant", Reference),
    FieldSpec::new("status", "status", Text),
    FieldSpec::new("lastServiceDate", "last_service_date", Date),
    FieldSpec::new("hoursMileage", "hours_mileage", Number),
    FieldSpec::new("cleanlinessRating", "cleanliness_rating", Number),
    FieldSpec::new("conditionRating", "condition_rating", Number),
    FieldSpec::new("equipmentMake", "equipment_make", Text),
    FieldSpec::new("equipmentModel", "equipment_model", Text),
    FieldSpec::new("yearMade", "year_made", Number),
    FieldSpec::new("isVerified", "is_verified", Boolean),
];

const MIXER_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("truckNumber", "truck_number", Text),
    FieldSpec::new("assignedPlant", "assigned_plant", Reference),
    FieldSpec::new("assignedOperator", "assigned_operator", Reference),
    FieldSpec::new("status", "status", Text),
    FieldSpec::new("lastServiceDate", "last_service_date", Date),
    FieldSpec::new("lastChipDate", "last_chip_date", Date),
    FieldSpec::new("cleanlinessRating", "cleanliness_rating", Number),
    FieldSpec::new("vin", "vin", Text),
    FieldSpec::new("make", "make", Text),
    FieldSpec::new("model", "model", Text),
    FieldSpec::new("year", "year", Number),
];

const TRAILER_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("trailerNumber", "trailer_number", Text),
    FieldSpec::new("assignedPlant", "assigned_plant", Reference),
    FieldSpec::new("assignedTractor", "assigned_tractor", Reference),
    FieldSpec::new("trailerType", "trailer_type", Text),
    FieldSpec::new("status", "status", Text),
    FieldSpec::new("lastServiceDate", "last_service_date", Date),
    FieldSpec::new("cleanlinessRating", "cleanliness_rating", Number),
];

const PICKUP_TRUCK_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("vin", "vin", Text),
    FieldSpec::new("make", "make", Text),
    FieldSpec::new("model", "model", Text),
    FieldSpec::new("year", "year", Number),
    FieldSpec::new("assignedPlant", "assigned_plant", Reference),
    FieldSpec::new("assignedOperator", "assigned_operator", Reference),
    FieldSpec::new("status", "status", Text),
    FieldSpec::new("mileage", "mileage", Number),
    FieldSpec::new("lastServiceDate", "last_service_date", Date),
];

static EQUIPMENT: EntityConfig = EntityConfig {
    kind: EntityKind::Equipment,
    table: "equipment",
    history_table: "equipment_history",
    history_fk: "equipment_id",
    fields: EQUIPMENT_FIELDS,
    untracked: &["notes"],
    required: &["identifying_number"],
    service_threshold_days: 90,
};

static MIXER: EntityConfig = EntityConfig {
    kind: EntityKind::Mixer,
    table: "mixers",
    history_table: "mixer_history",
    history_fk: "mixer_id",
    fields: MIXER_FIELDS,
    untracked: &["notes"],
    required: &["truck_number"],
    service_threshold_days: 90,
};

static TRAILER: EntityConfig = EntityConfig {
    kind: EntityKind::Trailer,
    table: "trailers",
    history_table: "trailer_history",
    history_fk: "trailer_id",
    fields: TRAILER_FIELDS,
    untracked: &["notes"],
    required: &["trailer_number"],
    service_threshold_days: 90,
};

static PICKUP_TRUCK: EntityConfig = EntityConfig {
    kind: EntityKind::PickupTruck,
    table: "pickup_trucks",
    history_table: "pickup_truck_history",
    history_fk: "pickup_truck_id",
    fields: PICKUP_TRUCK_FIELDS,
    untracked: &["notes"],
    required: &["vin"],
    service_threshold_days: 30,
};

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Equipment,
        EntityKind::Mixer,
        EntityKind::Trailer,
        EntityKind::PickupTruck,
    ];

    pub fn config(&self) -> &'static EntityConfig {
        match self {
            EntityKind::Equipment => &EQUIPMENT,
            EntityKind::Mixer => &MIXER,
            EntityKind::Trailer => &TRAILER,
            EntityKind::PickupTruck => &PICKUP_TRUCK,
        }
    }

    /// URL path segment (`pickup-trucks`).
    pub fn slug(&self) -> &'static str {
        match self {
            EntityKind::Equipment => "equipment",
            EntityKind::Mixer => "mixers",
            EntityKind::Trailer => "trailers",
            EntityKind::PickupTruck => "pickup-trucks",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "equipment" => Ok(EntityKind::Equipment),
            "mixer" | "mixers" => Ok(EntityKind::Mixer),
            "trailer" | "trailers" => Ok(EntityKind::Trailer),
            "pickup-truck" | "pickup-trucks" | "pickuptruck" | "pickuptrucks" => {
                Ok(EntityKind::PickupTruck)
            }
            _ => Err(format!(
                "unknown entity kind '{}' (expected equipment, mixers, trailers, pickup-trucks)",
                s
            )),
        }
    }
}

impl EntityConfig {
    /// Map a payload key to its storage column. Tracked fields accept either
    /// name; untracked columns only their storage name.
    pub fn resolve_column(&self, key: &str) -> Option<&'static str> {
        if let Some(spec) = find_spec(self.fields, key) {
            return Some(spec.storage_column);
        }
        self.untracked.iter().copied().find(|c| *c == key)
    }

    /// Every writable column, tracked first, in declaration order.
    pub fn writable_columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields
            .iter()
            .map(|s| s.storage_column)
            .chain(self.untracked.iter().copied())
    }
}
