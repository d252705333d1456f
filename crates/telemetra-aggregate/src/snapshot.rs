//! Snapshot export of aggregation results.
//!
//! The original pipeline wrote a mean table and a median table to disk
//! as a side effect of every aggregation, as input for an external
//! numeric batch tool. That behavior is preserved here as an opt-in
//! side-channel: callers decide whether to export, do it after the
//! computation succeeded, and keep failures off the response path.

use std::path::{Path, PathBuf};

use tracing::debug;

use telemetra_types::AggregationResult;

/// Errors that can occur while exporting a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// CSV serialization failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A destination for aggregation snapshots.
///
/// Implementations must be safe to skip: the aggregation contract does
/// not depend on any sink succeeding.
pub trait SnapshotSink {
    /// Export one aggregation result.
    fn export(&self, result: &AggregationResult) -> Result<(), SnapshotError>;
}

/// File name of the mean table.
pub const MEAN_FILE: &str = "mean_values.csv";
/// File name of the median table.
pub const MEDIAN_FILE: &str = "median_values.csv";

/// CSV snapshot writer.
///
/// Writes two tables into a directory: `mean_values.csv` with columns
/// `Sensor,mean_Value` and `median_values.csv` with columns
/// `Sensor,median_Value`. Column names match the tables the legacy
/// batch tool consumes.
pub struct CsvSnapshot {
    dir: PathBuf,
}

impl CsvSnapshot {
    /// Create a snapshot writer targeting the given directory.
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Path of the mean table.
    pub fn mean_path(&self) -> PathBuf {
        self.dir.join(MEAN_FILE)
    }

    /// Path of the median table.
    pub fn median_path(&self) -> PathBuf {
        self.dir.join(MEDIAN_FILE)
    }

    fn write_table(
        &self,
        path: &Path,
        value_header: &str,
        values: &std::collections::BTreeMap<String, f64>,
    ) -> Result<(), SnapshotError> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(["Sensor", value_header])?;
        for (device, value) in values {
            writer.write_record([device.as_str(), &value.to_string()])?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl SnapshotSink for CsvSnapshot {
    fn export(&self, result: &AggregationResult) -> Result<(), SnapshotError> {
        if !self.dir.exists() {
            std::fs::create_dir_all(&self.dir)?;
        }

        self.write_table(&self.mean_path(), "mean_Value", &result.mean_values)?;
        self.write_table(&self.median_path(), "median_Value", &result.median_values)?;

        debug!(
            "Wrote snapshot tables for {} devices to {}",
            result.device_count(),
            self.dir.display()
        );
        Ok(())
    }
}
