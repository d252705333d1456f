//! Aggregation engine for telemetra sensor readings.
//!
//! This crate turns a batch of untrusted, possibly malformed reading
//! records into per-device summary statistics (mean and median). It is
//! the only non-trivial computation in the system and is kept pure:
//! no I/O, no logging, no shared state. Every call is independent, so
//! concurrent use needs no coordination.
//!
//! Snapshot export (the legacy CSV tables the original pipeline fed to
//! an external batch tool) lives in [`snapshot`] as an explicitly
//! injected side-channel. It runs after the computation succeeds and
//! can never affect the aggregation result.
//!
//! # Example
//!
//! ```
//! use telemetra_aggregate::aggregate;
//! use telemetra_types::RawReading;
//!
//! let batch: Vec<RawReading> = serde_json::from_str(
//!     r#"[{"device_name":"Humidity Sensor","reading_value":60.2,"reading_time":"2024-09-29T16:10:00Z"}]"#,
//! )?;
//! let aggregation = aggregate(&batch)?;
//! assert_eq!(aggregation.result.mean_values["Humidity Sensor"], 60.2);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod engine;
mod error;
pub mod snapshot;

pub use engine::{Aggregation, REQUIRED_FIELDS, aggregate};
pub use error::{AggregateError, Result};
pub use snapshot::{CsvSnapshot, SnapshotError, SnapshotSink};
