//! ==============================================================================
//! domain.rs - reading and statistics records
//! ==============================================================================
//!
//! purpose:
//!     the json-serializable values the host hands out:
//!     - Reading: one sampled (or failed) dht11 observation
//!     - Stats / FieldStats: aggregates over the buffered history
//!
//! relationships:
//!     - used by: buffer.rs, stats.rs, service.rs, api.rs, telemetry.rs
//!
//! ==============================================================================

use chrono::{DateTime, Local, Timelike};
use serde::{Deserialize, Serialize};

/// error text returned once the sensor has been marked unavailable
pub const SENSOR_NOT_INITIALIZED: &str = "sensor not initialized";

/// round to one decimal place, half away from zero
///
/// every rounded field (reading values and stats averages) goes through here
/// so the rounding rule stays uniform.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// current local wall-clock time truncated to whole seconds
pub fn now_seconds() -> DateTime<Local> {
    let now = Local::now();
    now.with_nanosecond(0).unwrap_or(now)
}

/// one sampled (or failed) dht11 observation
///
/// serializes to the same json the dashboard expects:
/// - success: {"temperature": 22.5, "humidity": 41.0, "timestamp": "...", "success": true}
/// - failure: {"timestamp": "...", "success": false, "error": "..."}
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// temperature in celsius, one decimal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    /// relative humidity (0-100%), one decimal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    humidity: Option<f64>,
    /// capture time, second precision
    #[serde(with = "wall_clock")]
    timestamp: DateTime<Local>,
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl Reading {
    /// a successful reading; values are rounded to one decimal
    pub fn ok(temperature: f64, humidity: f64, timestamp: DateTime<Local>) -> Self {
        Self {
            temperature: Some(round1(temperature)),
            humidity: Some(round1(humidity)),
            timestamp,
            success: true,
            error: None,
        }
    }

    /// a failed reading carrying a description of what went wrong
    pub fn failed(error: impl Into<String>, timestamp: DateTime<Local>) -> Self {
        Self {
            temperature: None,
            humidity: None,
            timestamp,
            success: false,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    #[cfg(test)]
    pub fn temperature(&self) -> Option<f64> {
        self.temperature
    }

    #[cfg(test)]
    pub fn humidity(&self) -> Option<f64> {
        self.humidity
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// (temperature, humidity) when this reading is usable for history and stats
    ///
    /// a record claiming success but missing a value (e.g. hand-built json)
    /// counts as invalid.
    pub fn values(&self) -> Option<(f64, f64)> {
        if !self.success {
            return None;
        }
        Some((self.temperature?, self.humidity?))
    }
}

/// min/max/avg/current for one measured quantity
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldStats {
    pub current: f64,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

/// derived statistics over the buffered history
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub temperature: FieldStats,
    pub humidity: FieldStats,
    /// number of valid readings the stats were computed from
    pub readings_count: usize,
    #[serde(with = "wall_clock")]
    pub last_updated: DateTime<Local>,
}

/// "%Y-%m-%d %H:%M:%S" in local time, the format the dashboard displays
mod wall_clock {
    use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
    use serde::{de, Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S: Serializer>(ts: &DateTime<Local>, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&ts.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Local>, D::Error> {
        let raw = String::deserialize(d)?;
        let naive = NaiveDateTime::parse_from_str(&raw, FORMAT).map_err(de::Error::custom)?;
        Local
            .from_local_datetime(&naive)
            .earliest()
            .ok_or_else(|| de::Error::custom(format!("nonexistent local time: {raw}")))
    }
}
