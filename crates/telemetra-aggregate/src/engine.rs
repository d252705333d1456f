//! The aggregation pipeline: validate, group, summarize.

use std::collections::BTreeMap;

use telemetra_types::{AggregationResult, RawReading};

use crate::error::{AggregateError, Result};

/// Fields every aggregation batch must declare.
pub const REQUIRED_FIELDS: [&str; 3] = ["device_name", "reading_value", "reading_time"];

/// Outcome of aggregating one batch.
///
/// Besides the summary itself this carries row accounting, so callers
/// can log how much of the batch was actually usable. The engine
/// itself never logs.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    /// Per-device mean and median values.
    pub result: AggregationResult,
    /// Rows that contributed to the result.
    pub rows_used: usize,
    /// Rows dropped by per-row validation.
    pub rows_skipped: usize,
}

/// Aggregate a batch of raw readings into per-device mean and median.
///
/// The pipeline runs in two stages:
///
/// 1. **Batch schema validation.** The declared field set of the batch
///    (union over all elements) must include `device_name`,
///    `reading_value` and `reading_time`. A field missing from every
///    element - or an empty batch - aborts before any grouping with
///    [`AggregateError::MissingFields`].
/// 2. **Per-row validation and grouping.** A row is used when its
///    device name is non-empty, its value coerces to a finite f64 and
///    its timestamp coerces to a point in time. Malformed rows are
///    skipped and counted; they never poison the rest of the batch.
///    Grouping is by exact string equality on the device name, with
///    duplicates counted every time they appear.
///
/// For each group, mean is `sum / count` and median is the standard
/// statistical median: the middle element of the ascending sort for an
/// odd count, the arithmetic mean of the two middle elements for an
/// even count.
///
/// The function is pure: calling it twice on the same input yields
/// identical results, and there are no side effects of any kind.
///
/// # Errors
///
/// Returns [`AggregateError::MissingFields`] when the batch schema is
/// incomplete or the batch is empty.
pub fn aggregate(readings: &[RawReading]) -> Result<Aggregation> {
    validate_schema(readings)?;

    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    let mut rows_used = 0;
    let mut rows_skipped = 0;

    for raw in readings {
        let usable = raw
            .device()
            .filter(|_| raw.timestamp().is_some())
            .and_then(|device| raw.value().map(|value| (device, value)));

        match usable {
            Some((device, value)) => {
                groups.entry(device).or_default().push(value);
                rows_used += 1;
            }
            None => rows_skipped += 1,
        }
    }

    let mut result = AggregationResult::default();
    for (device, mut values) in groups {
        result.mean_values.insert(device.to_string(), mean(&values));
        result
            .median_values
            .insert(device.to_string(), median(&mut values));
    }

    Ok(Aggregation {
        result,
        rows_used,
        rows_skipped,
    })
}

/// Check the batch schema covers every required field.
///
/// A field counts as declared when any element carries it. Null values
/// deserialize to `None`, so `null` is treated the same as absent.
fn validate_schema(readings: &[RawReading]) -> Result<()> {
    let declared = |field: &str| {
        readings.iter().any(|r| match field {
            "device_name" => r.device_name.is_some(),
            "reading_value" => r.reading_value.is_some(),
            "reading_time" => r.reading_time.is_some(),
            _ => false,
        })
    };

    let missing_fields: Vec<String> = REQUIRED_FIELDS
        .iter()
        .filter(|f| !declared(f))
        .map(|f| f.to_string())
        .collect();

    if missing_fields.is_empty() {
        Ok(())
    } else {
        Err(AggregateError::MissingFields { missing_fields })
    }
}

/// Arithmetic mean. Callers guarantee a non-empty slice.
fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Statistical median. Sorts in place; callers guarantee non-empty.
fn median(values: &mut [f64]) -> f64 {
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        (values[mid - 1] + values[mid]) / 2.0
    }
}
