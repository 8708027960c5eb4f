//! TOML configuration: cache TTL, service thresholds, week zone and server
//! limits.
//!
//! Every section is optional; a missing file means all defaults.
//!
//! ```toml
//! [cache]
//! ttl_secs = 30
//!
//! [service]
//! pickup_truck_days = 45
//!
//! [verification]
//! utc_offset_minutes = -300
//!
//! [server]
//! port = 7002
//! ```

use crate::kinds::EntityKind;
use crate::status::WeekZone;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

// ── TOML Configuration Structs ──────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub verification: VerificationConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// The `[cache]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheConfig {
    /// Zero disables the read cache.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

/// The `[service]` section: days after the last service before an asset is
/// overdue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceConfig {
    #[serde(default = "default_equipment_days")]
    pub equipment_days: i64,
    #[serde(default = "default_mixer_days")]
    pub mixer_days: i64,
    #[serde(default = "default_trailer_days")]
    pub trailer_days: i64,
    #[serde(default = "default_pickup_truck_days")]
    pub pickup_truck_days: i64,
}

/// The `[verification]` section. Without an offset the Sunday week boundary
/// is taken in the machine's local time zone.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VerificationConfig {
    pub utc_offset_minutes: Option<i32>,
}

/// The `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_ttl_secs() -> u64 {
    30
}

// Service defaults are the per-kind entity thresholds.
fn default_equipment_days() -> i64 {
    EntityKind::Equipment.config().service_threshold_days
}

fn default_mixer_days() -> i64 {
    EntityKind::Mixer.config().service_threshold_days
}

fn default_trailer_days() -> i64 {
    EntityKind::Trailer.config().service_threshold_days
}

fn default_pickup_truck_days() -> i64 {
    EntityKind::PickupTruck.config().service_threshold_days
}

fn default_port() -> u16 {
    7002
}

fn default_body_limit() -> usize {
    1024 * 1024
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            ttl_secs: default_ttl_secs(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            equipment_days: default_equipment_days(),
            mixer_days: default_mixer_days(),
            trailer_days: default_trailer_days(),
            pickup_truck_days: default_pickup_truck_days(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: default_port(),
            body_limit_bytes: default_body_limit(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ServiceConfig {
    pub fn threshold_days(&self, kind: EntityKind) -> i64 {
        match kind {
            EntityKind::Equipment => self.equipment_days,
            EntityKind::Mixer => self.mixer_days,
            EntityKind::Trailer => self.trailer_days,
            EntityKind::PickupTruck => self.pickup_truck_days,
        }
    }
}

impl Settings {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    /// Zone for the Sunday week boundary. Validation guarantees the offset
    /// is in range; an out-of-range value falls back to local time.
    pub fn week_zone(&self) -> WeekZone {
        self.verification
            .utc_offset_minutes
            .and_then(WeekZone::from_offset_minutes)
            .unwrap_or_default()
    }
}

// ── TOML Parsing ────────────────────────────────────────────────

pub fn parse_toml(content: &str) -> Result<Settings> {
    let settings: Settings = toml::from_str(content)?;
    validate(&settings)?;
    Ok(settings)
}

pub fn parse_toml_file(path: &Path) -> Result<Settings> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    parse_toml(&content).with_context(|| format!("parsing config {}", path.display()))
}

/// Load settings from `path`, or defaults when no path is given.
pub fn load(path: Option<&Path>) -> Result<Settings> {
    match path {
        Some(p) => parse_toml_file(p),
        None => Ok(Settings::default()),
    }
}

fn validate(settings: &Settings) -> Result<()> {
    for kind in EntityKind::ALL {
        let days = settings.service.threshold_days(kind);
        if days < 0 {
            anyhow::bail!("service threshold for {} must be >= 0, got {}", kind, days);
        }
    }
    if let Some(minutes) = settings.verification.utc_offset_minutes {
        if WeekZone::from_offset_minutes(minutes).is_none() {
            anyhow::bail!(
                "verification.utc_offset_minutes must be within ±1439, got {}",
                minutes
            );
        }
    }
    if settings.server.port == 0 {
        anyhow::bail!("server.port must be non-zero");
    }
    if settings.server.body_limit_bytes == 0 {
        anyhow::bail!("server.body_limit_bytes must be non-zero");
    }
    if settings.server.request_timeout_secs == 0 {
        anyhow::bail!("server.request_timeout_secs must be non-zero");
    }
    Ok(())
}
