//! Core data model for sensor readings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::error::{InvalidReading, ValidationResult};

/// A persisted sensor reading.
///
/// `reading_time` is assigned by the server when the reading is
/// created and is never client-supplied. It survives a full replace;
/// only deletion removes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Row identifier assigned by the store.
    pub id: i64,
    /// Device the reading came from. Non-empty, not unique - repeated
    /// readings from one device are expected and meaningful.
    pub device_name: String,
    /// Observed numeric value.
    pub reading_value: f64,
    /// When the reading was recorded (server clock).
    #[serde(with = "time::serde::rfc3339")]
    pub reading_time: OffsetDateTime,
}

/// Payload for creating a reading or fully replacing one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReading {
    /// Device the reading came from.
    pub device_name: String,
    /// Observed numeric value.
    pub reading_value: f64,
}

impl NewReading {
    /// Validate the payload.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidReading`] if the device name is empty or the
    /// value is not a finite number.
    pub fn validate(&self) -> ValidationResult<()> {
        if self.device_name.is_empty() {
            return Err(InvalidReading::EmptyDeviceName);
        }
        if !self.reading_value.is_finite() {
            return Err(InvalidReading::NonFiniteValue(self.reading_value));
        }
        Ok(())
    }
}

/// Partial update payload for a reading.
///
/// Fields left as `None` are untouched. `reading_time` is deliberately
/// absent - it can never be changed after creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReadingPatch {
    /// New device name, if changing.
    #[serde(default)]
    pub device_name: Option<String>,
    /// New reading value, if changing.
    #[serde(default)]
    pub reading_value: Option<f64>,
}

impl ReadingPatch {
    /// Whether the patch changes anything at all.
    pub fn is_empty(&self) -> bool {
        self.device_name.is_none() && self.reading_value.is_none()
    }

    /// Validate the fields that are present.
    pub fn validate(&self) -> ValidationResult<()> {
        if let Some(ref name) = self.device_name
            && name.is_empty()
        {
            return Err(InvalidReading::EmptyDeviceName);
        }
        if let Some(value) = self.reading_value
            && !value.is_finite()
        {
            return Err(InvalidReading::NonFiniteValue(value));
        }
        Ok(())
    }
}

/// An untrusted reading-like record, as submitted for aggregation.
///
/// Every field is optional at the deserialization boundary: callers
/// send heterogeneous batches, and which fields are actually declared
/// is itself part of batch validation. Values are kept loosely typed
/// (`serde_json::Value`) so that coercion, not the JSON parser,
/// decides what counts as usable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawReading {
    /// Upstream identifier, tolerated but unused.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Device name, if declared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    /// Reading value, if declared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reading_value: Option<serde_json::Value>,
    /// Reading timestamp, if declared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reading_time: Option<serde_json::Value>,
}

impl RawReading {
    /// The device name, if present and non-empty.
    ///
    /// Names are matched exactly: case-sensitive, no trimming.
    pub fn device(&self) -> Option<&str> {
        self.device_name.as_deref().filter(|s| !s.is_empty())
    }

    /// The reading value coerced to a finite f64.
    ///
    /// Accepts JSON numbers and numeric strings; rejects NaN and
    /// infinities.
    pub fn value(&self) -> Option<f64> {
        coerce_f64(self.reading_value.as_ref()?)
    }

    /// The reading time coerced to a timestamp.
    ///
    /// Accepts RFC 3339 strings and unix-seconds numbers. The
    /// timestamp is validated for presence only; aggregation never
    /// computes over it.
    pub fn timestamp(&self) -> Option<OffsetDateTime> {
        coerce_timestamp(self.reading_time.as_ref()?)
    }
}

/// Coerce a JSON value to a finite f64.
fn coerce_f64(value: &serde_json::Value) -> Option<f64> {
    let n = match value {
        serde_json::Value::Number(n) => n.as_f64()?,
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Coerce a JSON value to a timestamp.
fn coerce_timestamp(value: &serde_json::Value) -> Option<OffsetDateTime> {
    match value {
        serde_json::Value::String(s) => OffsetDateTime::parse(s, &Rfc3339).ok(),
        serde_json::Value::Number(n) => {
            OffsetDateTime::from_unix_timestamp(n.as_i64()?).ok()
        }
        _ => None,
    }
}

/// Per-device summary statistics produced by the aggregation engine.
///
/// Both maps always carry the same key set: the distinct device names
/// that contributed at least one valid reading. `BTreeMap` keeps
/// serialization deterministic; key order carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregationResult {
    /// Arithmetic mean of each device's reading values.
    pub mean_values: BTreeMap<String, f64>,
    /// Statistical median of each device's reading values.
    pub median_values: BTreeMap<String, f64>,
}

impl AggregationResult {
    /// Number of devices in the result.
    pub fn device_count(&self) -> usize {
        self.mean_values.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // --- Reading serialization tests ---

    #[test]
    fn test_reading_serializes_rfc3339_timestamp() {
        let reading = Reading {
            id: 1,
            device_name: "Temperature Sensor".to_string(),
            reading_value: 25.4,
            reading_time: OffsetDateTime::UNIX_EPOCH,
        };

        let json = serde_json::to_string(&reading).unwrap();
        assert!(json.contains("\"device_name\":\"Temperature Sensor\""));
        assert!(json.contains("\"reading_value\":25.4"));
        assert!(json.contains("1970-01-01T00:00:00Z"));
    }

    #[test]
    fn test_reading_deserialization_roundtrip() {
        let json = r#"{"id":7,"device_name":"Pressure Sensor","reading_value":101.3,"reading_time":"2024-09-29T16:05:00Z"}"#;

        let reading: Reading = serde_json::from_str(json).unwrap();
        assert_eq!(reading.id, 7);
        assert_eq!(reading.device_name, "Pressure Sensor");
        assert_eq!(reading.reading_value, 101.3);
        assert_eq!(reading.reading_time.unix_timestamp(), 1_727_625_900);
    }

    // --- NewReading validation tests ---

    #[test]
    fn test_new_reading_valid() {
        let new = NewReading {
            device_name: "Humidity Sensor".to_string(),
            reading_value: 60.2,
        };
        assert!(new.validate().is_ok());
    }

    #[test]
    fn test_new_reading_empty_device_name() {
        let new = NewReading {
            device_name: String::new(),
            reading_value: 1.0,
        };
        let err = new.validate().unwrap_err();
        assert!(err.to_string().contains("device_name"));
    }

    #[test]
    fn test_new_reading_non_finite_value() {
        let new = NewReading {
            device_name: "X".to_string(),
            reading_value: f64::NAN,
        };
        assert!(new.validate().is_err());

        let new = NewReading {
            device_name: "X".to_string(),
            reading_value: f64::INFINITY,
        };
        assert!(new.validate().is_err());
    }

    // --- ReadingPatch tests ---

    #[test]
    fn test_patch_empty() {
        let patch = ReadingPatch::default();
        assert!(patch.is_empty());
        assert!(patch.validate().is_ok());
    }

    #[test]
    fn test_patch_partial_fields() {
        let patch: ReadingPatch =
            serde_json::from_str(r#"{"reading_value": 3.5}"#).unwrap();
        assert!(patch.device_name.is_none());
        assert_eq!(patch.reading_value, Some(3.5));
        assert!(!patch.is_empty());
    }

    #[test]
    fn test_patch_rejects_empty_name() {
        let patch = ReadingPatch {
            device_name: Some(String::new()),
            reading_value: None,
        };
        assert!(patch.validate().is_err());
    }

    // --- RawReading coercion tests ---

    #[test]
    fn test_raw_reading_all_fields_present() {
        let raw: RawReading = serde_json::from_str(
            r#"{"id":1,"device_name":"Nuclear Reactor","reading_value":112.58,"reading_time":"2024-09-29T16:23:26.146783Z"}"#,
        )
        .unwrap();

        assert_eq!(raw.device(), Some("Nuclear Reactor"));
        assert_eq!(raw.value(), Some(112.58));
        assert!(raw.timestamp().is_some());
    }

    #[test]
    fn test_raw_reading_missing_fields_deserialize_as_none() {
        let raw: RawReading = serde_json::from_str(r#"{"device_name":"A"}"#).unwrap();
        assert_eq!(raw.device(), Some("A"));
        assert!(raw.value().is_none());
        assert!(raw.timestamp().is_none());
    }

    #[test]
    fn test_raw_reading_empty_device_name_is_none() {
        let raw: RawReading = serde_json::from_str(r#"{"device_name":""}"#).unwrap();
        assert!(raw.device().is_none());
        // The field was still declared, even though unusable.
        assert!(raw.device_name.is_some());
    }

    #[test]
    fn test_raw_reading_value_from_numeric_string() {
        let raw: RawReading =
            serde_json::from_str(r#"{"reading_value":"25.4"}"#).unwrap();
        assert_eq!(raw.value(), Some(25.4));
    }

    #[test]
    fn test_raw_reading_value_rejects_non_numeric() {
        let raw: RawReading =
            serde_json::from_str(r#"{"reading_value":"not a number"}"#).unwrap();
        assert!(raw.value().is_none());

        let raw: RawReading =
            serde_json::from_str(r#"{"reading_value":[1,2]}"#).unwrap();
        assert!(raw.value().is_none());
    }

    #[test]
    fn test_raw_reading_timestamp_from_unix_seconds() {
        let raw: RawReading =
            serde_json::from_str(r#"{"reading_time":1727625900}"#).unwrap();
        assert_eq!(raw.timestamp().unwrap().unix_timestamp(), 1_727_625_900);
    }

    #[test]
    fn test_raw_reading_timestamp_rejects_garbage() {
        let raw: RawReading =
            serde_json::from_str(r#"{"reading_time":"yesterday-ish"}"#).unwrap();
        assert!(raw.timestamp().is_none());
    }

    // --- AggregationResult tests ---

    #[test]
    fn test_aggregation_result_serialization() {
        let mut result = AggregationResult::default();
        result
            .mean_values
            .insert("Humidity Sensor".to_string(), 106.93333333333334);
        result
            .median_values
            .insert("Humidity Sensor".to_string(), 100.2);

        let json = serde_json::to_value(&result).unwrap();
        assert!(json["mean_values"]["Humidity Sensor"].as_f64().unwrap() > 106.9);
        assert_eq!(json["median_values"]["Humidity Sensor"], 100.2);
    }

    #[test]
    fn test_aggregation_result_device_count() {
        let mut result = AggregationResult::default();
        assert_eq!(result.device_count(), 0);

        result.mean_values.insert("A".to_string(), 1.0);
        result.median_values.insert("A".to_string(), 1.0);
        assert_eq!(result.device_count(), 1);
    }
}
