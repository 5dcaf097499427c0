//! Sensor readings — last-known samples per sensor attribute.
//!
//! A sensor may report several attributes (a temp/humidity probe publishes
//! both). Each attribute is merged independently so a humidity message never
//! clobbers the temperature observed a moment earlier.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PayloadError;
use crate::id::{HouseId, SensorId, SensorKey};
use crate::time::Timestamp;

/// Physical quantity reported by a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorAttribute {
    Temperature,
    Humidity,
    Light,
}

impl SensorAttribute {
    /// All attributes, in display order.
    pub const ALL: [Self; 3] = [Self::Temperature, Self::Humidity, Self::Light];
}

impl fmt::Display for SensorAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Temperature => f.write_str("temperature"),
            Self::Humidity => f.write_str("humidity"),
            Self::Light => f.write_str("light"),
        }
    }
}

/// Raised when a topic segment names no known sensor attribute.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sensor attribute {0:?}")]
pub struct UnknownAttribute(pub String);

impl FromStr for SensorAttribute {
    type Err = UnknownAttribute;

    /// Accepts the canonical names plus the short `temp` / `humi` forms
    /// older firmware publishes.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "temperature" | "temp" => Ok(Self::Temperature),
            "humidity" | "humi" => Ok(Self::Humidity),
            "light" => Ok(Self::Light),
            other => Err(UnknownAttribute(other.to_string())),
        }
    }
}

/// A single observed value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub value: f64,
    pub observed_at: Timestamp,
}

/// Last-known readings of one sensor.
///
/// An attribute is `None` until it has been observed at least once; a
/// reported `0.0` is a real observation and is kept as `Some`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub house_id: HouseId,
    pub sensor_id: SensorId,
    pub temperature: Option<Sample>,
    pub humidity: Option<Sample>,
    pub light: Option<Sample>,
}

impl SensorReading {
    /// An empty reading for `key`, before any attribute is merged.
    #[must_use]
    pub fn empty(key: &SensorKey) -> Self {
        Self {
            house_id: key.house.clone(),
            sensor_id: key.sensor,
            temperature: None,
            humidity: None,
            light: None,
        }
    }

    /// Entity key of this reading.
    #[must_use]
    pub fn key(&self) -> SensorKey {
        SensorKey::new(self.house_id.clone(), self.sensor_id)
    }

    /// Latest sample for `attribute`, if any.
    #[must_use]
    pub fn get(&self, attribute: SensorAttribute) -> Option<&Sample> {
        match attribute {
            SensorAttribute::Temperature => self.temperature.as_ref(),
            SensorAttribute::Humidity => self.humidity.as_ref(),
            SensorAttribute::Light => self.light.as_ref(),
        }
    }

    /// Overwrite a single attribute, leaving the others untouched.
    pub fn merge(&mut self, attribute: SensorAttribute, value: f64, at: Timestamp) {
        let sample = Some(Sample {
            value,
            observed_at: at,
        });
        match attribute {
            SensorAttribute::Temperature => self.temperature = sample,
            SensorAttribute::Humidity => self.humidity = sample,
            SensorAttribute::Light => self.light = sample,
        }
    }

    /// Newest observation time across all attributes.
    #[must_use]
    pub fn observed_at(&self) -> Option<Timestamp> {
        SensorAttribute::ALL
            .iter()
            .filter_map(|attr| self.get(*attr).map(|s| s.observed_at))
            .max()
    }
}

/// Temperature and humidity of one sensor, as read together by dashboards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempHumi {
    pub temperature: Option<Sample>,
    pub humidity: Option<Sample>,
}

impl TempHumi {
    /// `None` when neither attribute has been observed.
    #[must_use]
    pub fn from_reading(reading: &SensorReading) -> Option<Self> {
        if reading.temperature.is_none() && reading.humidity.is_none() {
            return None;
        }
        Some(Self {
            temperature: reading.temperature,
            humidity: reading.humidity,
        })
    }
}

/// Parse an ASCII float sensor payload.
///
/// # Errors
///
/// Returns [`PayloadError::NotANumber`] when the trimmed payload does not
/// parse, or parses to NaN / infinity.
pub fn parse_sample(payload: &str) -> Result<f64, PayloadError> {
    let trimmed = payload.trim();
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(PayloadError::NotANumber(trimmed.to_string())),
    }
}

/// Aggregate payload some firmware publishes instead of one topic per
/// attribute: `{"temp":27.5,"humi":65.3,"light":512}`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SensorBundle {
    #[serde(alias = "temp")]
    pub temperature: Option<f64>,
    #[serde(alias = "humi")]
    pub humidity: Option<f64>,
    pub light: Option<f64>,
}

impl SensorBundle {
    /// Parse a JSON bundle.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError::InvalidBundle`] for anything that is not a
    /// JSON object with optional numeric fields.
    pub fn parse(payload: &str) -> Result<Self, PayloadError> {
        serde_json::from_str(payload).map_err(PayloadError::InvalidBundle)
    }

    /// The attributes present in the bundle. Non-finite values are skipped.
    pub fn samples(&self) -> impl Iterator<Item = (SensorAttribute, f64)> + '_ {
        [
            (SensorAttribute::Temperature, self.temperature),
            (SensorAttribute::Humidity, self.humidity),
            (SensorAttribute::Light, self.light),
        ]
        .into_iter()
        .filter_map(|(attr, value)| value.filter(|v| v.is_finite()).map(|v| (attr, v)))
    }
}
