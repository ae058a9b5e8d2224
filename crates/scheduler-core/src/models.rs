use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use thiserror::Error;

/// The `data_type` hint stored alongside a series' raw `target_value` text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
pub enum DataType {
    Auto,
    Int,
    Float,
    String,
    Bool,
}

#[derive(Error, Debug, PartialEq)]
#[error("invalid data type: {0}")]
pub struct ParseDataTypeError(String);

impl FromStr for DataType {
    type Err = ParseDataTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(DataType::Auto),
            "int" => Ok(DataType::Int),
            "float" => Ok(DataType::Float),
            "string" => Ok(DataType::String),
            "bool" => Ok(DataType::Bool),
            _ => Err(ParseDataTypeError(s.to_string())),
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DataType::Auto => "auto",
            DataType::Int => "int",
            DataType::Float => "float",
            DataType::String => "string",
            DataType::Bool => "bool",
        };
        write!(f, "{s}")
    }
}

/// Tagged variant for an occurrence's effective output value (design notes §9).
/// `Auto` carries the raw text unparsed, leaving the sink to probe the type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TargetValue {
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
    Auto(String),
}

impl TargetValue {
    /// Interprets `raw` according to `data_type`, matching what a wire writer
    /// would do at write time.
    pub fn from_raw(raw: &str, data_type: DataType) -> Self {
        match data_type {
            DataType::Auto => TargetValue::Auto(raw.to_string()),
            DataType::Int => raw
                .parse::<i64>()
                .map(TargetValue::Int)
                .unwrap_or_else(|_| TargetValue::Auto(raw.to_string())),
            DataType::Float => raw
                .parse::<f64>()
                .map(TargetValue::Float)
                .unwrap_or_else(|_| TargetValue::Auto(raw.to_string())),
            DataType::Bool => raw
                .parse::<bool>()
                .map(TargetValue::Bool)
                .unwrap_or_else(|_| TargetValue::Auto(raw.to_string())),
            DataType::String => TargetValue::String(raw.to_string()),
        }
    }

    /// Renders the value back to wire text, for the `ValueSink` contract.
    pub fn as_text(&self) -> String {
        match self {
            TargetValue::Int(v) => v.to_string(),
            TargetValue::Float(v) => v.to_string(),
            TargetValue::String(v) => v.clone(),
            TargetValue::Bool(v) => v.to_string(),
            TargetValue::Auto(v) => v.clone(),
        }
    }
}

/// A named `(background, foreground)` colour pair used for display and grouping.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq, Eq)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub bg_color: String,
    pub fg_color: String,
    pub sort_order: i32,
    pub is_system: bool,
}

/// The eight system categories seeded on first initialisation (spec §6.4).
pub const SYSTEM_CATEGORY_SEED: [(i64, &str, &str, &str); 8] = [
    (1, "Red", "#FF0000", "#FFFFFF"),
    (2, "Pink", "#FF69B4", "#FFFFFF"),
    (3, "Light Purple", "#DDA0DD", "#000000"),
    (4, "Green", "#00FF00", "#000000"),
    (5, "Blue", "#0000FF", "#FFFFFF"),
    (6, "Yellow", "#FFFF00", "#000000"),
    (7, "Orange", "#FFA500", "#000000"),
    (8, "Gray", "#808080", "#FFFFFF"),
];

pub const DEFAULT_CATEGORY_ID: i64 = 1;

#[derive(Debug, Clone, Default)]
pub struct NewCategoryData {
    pub name: String,
    pub bg_color: String,
    pub fg_color: String,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateCategoryData {
    pub bg_color: Option<String>,
    pub fg_color: Option<String>,
    pub sort_order: Option<i32>,
}

/// A repeating task defined by an iCalendar-style recurrence rule.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Series {
    pub id: i64,
    pub task_name: String,
    pub endpoint: String,
    pub node_id: String,
    pub target_value: String,
    pub data_type: DataType,
    pub rrule_str: String,
    pub category_id: i64,
    pub priority: i32,
    pub enabled: bool,
    /// Opaque to the core; never inspected, only carried through to the sink.
    pub credential: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewSeriesData {
    pub task_name: String,
    pub endpoint: String,
    pub node_id: String,
    pub target_value: String,
    pub data_type: DataType,
    pub rrule_str: String,
    pub category_id: i64,
    pub priority: i32,
    pub enabled: bool,
    pub credential: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateSeriesData {
    pub task_name: Option<String>,
    pub endpoint: Option<String>,
    pub node_id: Option<String>,
    pub target_value: Option<String>,
    pub data_type: Option<DataType>,
    pub rrule_str: Option<String>,
    pub category_id: Option<i64>,
    pub priority: Option<i32>,
    pub enabled: Option<bool>,
}

/// A per-date cancel/override record attached to a series.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
pub enum ExceptionAction {
    Cancel,
    Override,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Exception {
    pub id: i64,
    pub schedule_id: i64,
    pub occurrence_date: NaiveDate,
    pub action: ExceptionAction,
    pub override_start: Option<DateTime<Utc>>,
    pub override_end: Option<DateTime<Utc>>,
    pub override_task_name: Option<String>,
    pub override_target_value: Option<String>,
    pub override_category_id: Option<i64>,
    pub note: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewExceptionData {
    pub schedule_id: i64,
    pub occurrence_date: NaiveDate,
    pub action: ExceptionAction,
    pub override_start: Option<DateTime<Utc>>,
    pub override_end: Option<DateTime<Utc>>,
    pub override_task_name: Option<String>,
    pub override_target_value: Option<String>,
    pub override_category_id: Option<i64>,
    pub note: Option<String>,
}

/// A named collection of holiday entries; at most one may be the default.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HolidayCalendar {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub is_default: bool,
}

/// A date (full-day or time-window) on a holiday calendar that may rewrite
/// category and target for occurrences that day.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HolidayEntry {
    pub id: i64,
    pub calendar_id: i64,
    pub date: NaiveDate,
    pub name: String,
    pub is_full_day: bool,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub override_category_id: Option<i64>,
    pub override_target_value: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewHolidayCalendarData {
    pub name: String,
    pub description: Option<String>,
    pub is_default: bool,
}

#[derive(Debug, Clone)]
pub struct NewHolidayEntryData {
    pub calendar_id: i64,
    pub date: NaiveDate,
    pub name: String,
    pub is_full_day: bool,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub override_category_id: Option<i64>,
    pub override_target_value: Option<String>,
}

/// Single-row process configuration.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct GeneralSettings {
    pub profile_name: String,
    pub enable_schedule: bool,
    pub scan_rate: i64,
    pub refresh_rate: i64,
    pub active_from: Option<DateTime<Utc>>,
    pub active_to: Option<DateTime<Utc>>,
    pub output_type: String,
    pub refresh_output: bool,
    pub generate_events: bool,
    /// Seconds between retry attempts for a transient sink failure on a
    /// retry-until-end occurrence (spec §4.5 retry policy).
    pub opc_write_timeout: i64,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            profile_name: "default".to_string(),
            enable_schedule: true,
            scan_rate: 30,
            refresh_rate: 5,
            active_from: None,
            active_to: None,
            output_type: "auto".to_string(),
            refresh_output: false,
            generate_events: false,
            opc_write_timeout: 30,
        }
    }
}

impl GeneralSettings {
    /// Whether the active-period gate (§4.5) currently admits sink calls.
    pub fn active_period_admits(&self, now: DateTime<Utc>) -> bool {
        match (self.active_from, self.active_to) {
            (Some(from), Some(to)) => now >= from && now < to,
            _ => true,
        }
    }
}

/// Single-row, process-wide, time-bounded forced value (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RuntimeOverride {
    pub override_value: String,
    pub override_until: Option<DateTime<Utc>>,
}

impl RuntimeOverride {
    /// Whether this override is still live at `now` (absent `override_until`
    /// means permanent until cleared).
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        match self.override_until {
            Some(until) => until > now,
            None => true,
        }
    }
}

/// Which layer produced a `ResolvedOccurrence`'s current fields.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OccurrenceSource {
    Weekly,
    Holiday,
    Exception,
    Override,
}

/// An occurrence after all override layers have been applied (spec §3, computed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedOccurrence {
    pub series_id: i64,
    pub source: OccurrenceSource,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub category_id: i64,
    pub bg_color: String,
    pub fg_color: String,
    pub target_value: TargetValue,
    pub priority: i32,
    pub is_exception: bool,
    pub is_holiday: bool,
    pub is_override: bool,
    /// `true` when the originating rule's nominal `DURATION` was `PT0M`.
    /// `end - start` is still lifted to at least one minute for display and
    /// scheduling, so this flag — not the width — is what the Scheduler Loop
    /// keys its retry policy on (spec §4.1, §4.5).
    pub single_shot: bool,
    pub occurrence_key: String,
}

impl ResolvedOccurrence {
    pub fn make_key(series_id: i64, start: DateTime<Utc>) -> String {
        format!("{series_id}:{}", start.to_rfc3339())
    }
}
