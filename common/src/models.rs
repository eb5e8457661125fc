use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;
use uuid::Uuid;

// Helper functions for optional Tz serialization
fn serialize_opt_tz<S>(tz: &Option<Tz>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match tz {
        Some(tz) => serializer.serialize_some(&tz.to_string()),
        None => serializer.serialize_none(),
    }
}

fn deserialize_opt_tz<'de, D>(deserializer: D) -> Result<Option<Tz>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) => Tz::from_str(&s)
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

// ============================================================================
// Business record
// ============================================================================

/// Business represents one tenant of the trigger engine, as stored in the
/// business repository. The engine reads the whole record and only ever
/// appends to `upcoming_jobs` (plus caching a resolved location).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Business {
    pub id: Uuid,
    pub name: String,
    /// Street address, input to the geocoding fallback when location is unset.
    pub address: Option<String>,
    pub location: Option<Coordinates>,
    #[serde(
        serialize_with = "serialize_opt_tz",
        deserialize_with = "deserialize_opt_tz",
        default
    )]
    pub time_zone: Option<Tz>,
    pub operating_hours: Option<OperatingHours>,
    pub preferences: TriggerPreferences,
    pub upcoming_jobs: Vec<PendingJob>,
    /// Optimistic concurrency token, bumped on every stored mutation.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Local open/close wall-clock times. `close_local` numerically before
/// `open_local` means the window wraps past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatingHours {
    pub open_local: NaiveTime,
    pub close_local: NaiveTime,
}

// ============================================================================
// Trigger preferences
// ============================================================================

/// Per-business opt-in flags. The set of keys is closed: unknown keys in a
/// stored record are a data error and rejected at deserialization time
/// rather than silently ignored.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TriggerPreferences {
    #[serde(default)]
    pub weather: WeatherPreferences,
    #[serde(default)]
    pub time_based: TimeBasedPreferences,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WeatherPreferences {
    #[serde(default)]
    pub hot_sunny: bool,
    #[serde(default)]
    pub rainy: bool,
    #[serde(default)]
    pub cool_pleasant: bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TimeBasedPreferences {
    #[serde(default)]
    pub weekend_specials: bool,
    #[serde(default)]
    pub payday_sales: bool,
}

impl TriggerPreferences {
    /// Whether the business has opted into the given trigger category.
    /// Mapping: hot → hotSunny, cold → coolPleasant, rain → rainy.
    pub fn allows(&self, category: TriggerCategory) -> bool {
        match category {
            TriggerCategory::Hot => self.weather.hot_sunny,
            TriggerCategory::Cold => self.weather.cool_pleasant,
            TriggerCategory::Rain => self.weather.rainy,
            TriggerCategory::Weekend => self.time_based.weekend_specials,
            TriggerCategory::Payday => self.time_based.payday_sales,
        }
    }
}

// ============================================================================
// Trigger categories and pending jobs
// ============================================================================

/// The reason a generation job was scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerCategory {
    Hot,
    Cold,
    Rain,
    Weekend,
    Payday,
}

impl TriggerCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerCategory::Hot => "hot",
            TriggerCategory::Cold => "cold",
            TriggerCategory::Rain => "rain",
            TriggerCategory::Weekend => "weekend",
            TriggerCategory::Payday => "payday",
        }
    }
}

impl std::fmt::Display for TriggerCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One already-dispatched, not-yet-fired generation job. The downstream
/// consumer removes the entry once the job fires; this engine only appends.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingJob {
    pub category: TriggerCategory,
    pub context: serde_json::Value,
    pub scheduled_at: DateTime<Utc>,
    /// Name under which the one-off invocation was registered with the
    /// external scheduling service.
    pub schedule_name: String,
}

// ============================================================================
// Weather types
// ============================================================================

/// One hourly forecast sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub at: DateTime<Utc>,
    pub temperature_c: f64,
    pub precipitation_mm: f64,
}

/// Local "normal" temperature computed from recent history. `std_dev` is
/// never below the configured floor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeatherBaseline {
    pub mean: f64,
    pub std_dev: f64,
}

/// A contiguous span of forecast points classified hot, cold, or rain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionWindow {
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub category: TriggerCategory,
}
