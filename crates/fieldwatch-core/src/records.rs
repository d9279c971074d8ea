//! Telemetry records and error events decoded from store rows.
//!
//! Stores hand back loosely-typed items ([`Row`]). Decoding selects the
//! reading variant from the site's [`Category`], so a drip site can never be
//! rendered with air columns.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CoreError, Result};
use crate::sites::Category;

/// A raw item as returned by a store.
pub type Row = serde_json::Map<String, Value>;

/// Placeholder rendered for absent fields.
pub const MISSING: &str = "N/A";

/// Store field holding the site code.
pub const SITE_FIELD: &str = "site_name";

/// Store field holding the record or event time.
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// A single sensor value, numeric or textual.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// Whole-number reading such as a pulse counter.
    Integer(i64),
    /// Whole-number reading above `i64::MAX`.
    Unsigned(u64),
    /// Fractional reading.
    Number(f64),
    /// Textual reading (status words, firmware strings).
    Text(String),
}

impl Scalar {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Number(n) => n
                .as_i64()
                .map(Self::Integer)
                .or_else(|| n.as_u64().map(Self::Unsigned))
                .or_else(|| n.as_f64().map(Self::Number))
                .or_else(|| Some(Self::Text(n.to_string()))),
            Value::String(s) => Some(Self::Text(s.clone())),
            Value::Bool(b) => Some(Self::Text(b.to_string())),
            other => Some(Self::Text(other.to_string())),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{n}"),
            Self::Unsigned(n) => write!(f, "{n}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Renders an optional scalar, substituting [`MISSING`] when absent.
#[must_use]
pub fn cell(value: Option<&Scalar>) -> String {
    value.map_or_else(|| MISSING.to_string(), ToString::to_string)
}

/// Sensor values reported by an air-line site.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AirReading {
    /// Air temperature.
    pub temperature: Option<Scalar>,
    /// Water temperature.
    pub water_temp: Option<Scalar>,
    /// Discharge rate.
    pub discharge: Option<Scalar>,
    /// Line pressure.
    pub pressure: Option<Scalar>,
    /// Pulse counter.
    pub counter: Option<Scalar>,
}

/// Sensor values reported by a drip-line site.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DripReading {
    /// First soil moisture probe.
    pub soil_a: Option<Scalar>,
    /// Second soil moisture probe.
    pub soil_b: Option<Scalar>,
    /// Air temperature.
    pub temperature: Option<Scalar>,
    /// Discharge rate.
    pub discharge: Option<Scalar>,
    /// Line pressure.
    pub pressure: Option<Scalar>,
    /// Pulse counter.
    pub counter: Option<Scalar>,
}

/// Category-specific sensor values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "lowercase")]
pub enum Reading {
    /// Air-line values.
    Air(AirReading),
    /// Drip-line values.
    Drip(DripReading),
}

impl Reading {
    /// The category this reading belongs to.
    #[must_use]
    pub const fn category(&self) -> Category {
        match self {
            Self::Air(_) => Category::Air,
            Self::Drip(_) => Category::Drip,
        }
    }

    /// Values in column order, excluding the timestamp.
    #[must_use]
    pub fn cells(&self) -> Vec<String> {
        match self {
            Self::Air(r) => vec![
                cell(r.temperature.as_ref()),
                cell(r.water_temp.as_ref()),
                cell(r.discharge.as_ref()),
                cell(r.pressure.as_ref()),
                cell(r.counter.as_ref()),
            ],
            Self::Drip(r) => vec![
                cell(r.soil_a.as_ref()),
                cell(r.soil_b.as_ref()),
                cell(r.temperature.as_ref()),
                cell(r.discharge.as_ref()),
                cell(r.pressure.as_ref()),
                cell(r.counter.as_ref()),
            ],
        }
    }
}

/// One row of a site's time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    /// Site the record belongs to.
    pub site_code: String,
    /// Raw timestamp as stored.
    pub timestamp: String,
    /// Sensor values.
    pub reading: Reading,
}

impl TelemetryRecord {
    /// Decodes a store row for a site of the given category.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::MalformedRecord` if the row has no string timestamp.
    pub fn from_row(site_code: &str, category: Category, row: &Row) -> Result<Self> {
        let timestamp = row
            .get(TIMESTAMP_FIELD)
            .and_then(Value::as_str)
            .ok_or_else(|| CoreError::MalformedRecord {
                site: site_code.to_string(),
                reason: "missing string timestamp".to_string(),
            })?
            .to_string();

        let field = |name: &str| row.get(name).and_then(Scalar::from_value);
        let reading = match category {
            Category::Air => Reading::Air(AirReading {
                temperature: field("temperature"),
                water_temp: field("water_temp"),
                discharge: field("discharge"),
                pressure: field("pressure"),
                counter: field("counter"),
            }),
            Category::Drip => Reading::Drip(DripReading {
                soil_a: field("soil_1"),
                soil_b: field("soil_2"),
                temperature: field("temperature"),
                discharge: field("discharge"),
                pressure: field("pressure"),
                counter: field("counter"),
            }),
        };

        Ok(Self {
            site_code: site_code.to_string(),
            timestamp,
            reading,
        })
    }
}

/// An error reported by a site's firmware.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEvent {
    /// Site the event belongs to.
    pub site_code: String,
    /// Raw event time as stored.
    pub timestamp: String,
    /// Error text.
    pub message: String,
    /// Firmware version tag.
    pub version: String,
}

impl ErrorEvent {
    /// Decodes an error log row. Missing text fields take placeholder values.
    #[must_use]
    pub fn from_row(site_code: &str, row: &Row) -> Self {
        let text = |name: &str, default: &str| match row.get(name) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => default.to_string(),
            Some(other) => other.to_string(),
        };

        Self {
            site_code: site_code.to_string(),
            timestamp: text(TIMESTAMP_FIELD, ""),
            message: text("message", "No message"),
            version: text("version", "unknown"),
        }
    }
}
