//! # Status Derivation: Service-Overdue and Weekly Verification
//!
//! Pure helpers behind the overview filters and statistics. They read only
//! their arguments; the caller supplies "now", which keeps them testable with
//! a fixed clock.
//!
//! ## Verification cadence
//!
//! An entity is verified for the current week when its `updated_last` stamp
//! falls on or after the most recent Sunday 00:00, nothing was edited after
//! the stamp (`updated_at` and the newest history row are not later), and an
//! actor is recorded. Crossing a Sunday boundary or editing the entity
//! invalidates verification.

use crate::entity::EntityRow;
use crate::field::FieldType;
use crate::normalize::{normalize, Normalized};
use chrono::{DateTime, Datelike, Duration, FixedOffset, Local, NaiveDate, TimeZone, Utc};
use serde::Serialize;

/// True if the last service is unknown or older than `threshold_days`.
pub fn is_service_overdue(
    last_service: Option<NaiveDate>,
    threshold_days: i64,
    today: NaiveDate,
) -> bool {
    match last_service {
        None => true,
        Some(date) => (today - date).num_days() > threshold_days,
    }
}

/// Most recent Sunday at 00:00 in `now`'s time zone.
pub fn start_of_week<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Tz> {
    let tz = now.timezone();
    let days_back = now.weekday().num_days_from_sunday() as i64;
    let sunday = now.date_naive() - Duration::days(days_back);
    let midnight = sunday.and_time(chrono::NaiveTime::MIN);
    // A DST gap at midnight has no local instant; fall back to the UTC reading.
    tz.from_local_datetime(&midnight)
        .earliest()
        .unwrap_or_else(|| tz.from_utc_datetime(&midnight))
}

/// Weekly verification check.
///
/// Returns false when `updated_last` or `updated_by` is absent (a blank
/// actor counts as absent). An absent `updated_at` places no constraint.
pub fn is_verified<Tz: TimeZone>(
    updated_last: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    updated_by: Option<&str>,
    latest_history: Option<DateTime<Utc>>,
    now: &DateTime<Tz>,
) -> bool {
    let Some(verified_at) = updated_last else {
        return false;
    };
    if updated_by.map_or(true, |a| a.trim().is_empty()) {
        return false;
    }
    let week_start = start_of_week(now).with_timezone(&Utc);
    let edited_after = updated_at.is_some_and(|t| t > verified_at);
    let history_after = latest_history.is_some_and(|t| t > verified_at);
    !edited_after && !history_after && verified_at >= week_start
}

/// Time zone used for the Sunday week boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WeekZone {
    /// The machine's local time zone.
    #[default]
    Local,
    Fixed(FixedOffset),
}

impl WeekZone {
    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .map(WeekZone::Fixed)
    }

    pub fn is_verified(
        &self,
        updated_last: Option<DateTime<Utc>>,
        updated_at: Option<DateTime<Utc>>,
        updated_by: Option<&str>,
        latest_history: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> bool {
        match self {
            WeekZone::Local => is_verified(
                updated_last,
                updated_at,
                updated_by,
                latest_history,
                &now.with_timezone(&Local),
            ),
            WeekZone::Fixed(offset) => is_verified(
                updated_last,
                updated_at,
                updated_by,
                latest_history,
                &now.with_timezone(offset),
            ),
        }
    }

    /// Calendar day of `now` in this zone.
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        match self {
            WeekZone::Local => now.with_timezone(&Local).date_naive(),
            WeekZone::Fixed(offset) => now.with_timezone(offset).date_naive(),
        }
    }
}

/// Derived flags for one entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityStatus {
    pub service_overdue: bool,
    pub verified: bool,
    pub last_service_date: Option<NaiveDate>,
    pub days_since_service: Option<i64>,
}

impl EntityStatus {
    pub fn derive(
        row: &EntityRow,
        threshold_days: i64,
        latest_history: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        zone: WeekZone,
    ) -> Self {
        let today = zone.today(now);
        let last_service = match normalize(FieldType::Date, row.get("last_service_date")) {
            Normalized::Date(d) => Some(d),
            _ => None,
        };
        EntityStatus {
            service_overdue: is_service_overdue(last_service, threshold_days, today),
            verified: zone.is_verified(
                row.updated_last,
                row.updated_at,
                row.updated_by.as_deref(),
                latest_history,
                now,
            ),
            last_service_date: last_service,
            days_since_service: last_service.map(|d| (today - d).num_days()),
        }
    }
}
