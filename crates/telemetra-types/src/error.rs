//! Error types for reading validation in telemetra-types.

use thiserror::Error;

/// Errors raised when a client-supplied reading fails validation.
///
/// These cover single-record payloads (create, replace, patch). Batch
/// validation for aggregation lives in telemetra-aggregate.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum InvalidReading {
    /// `device_name` was empty.
    #[error("device_name cannot be empty")]
    EmptyDeviceName,

    /// `reading_value` was NaN or infinite.
    #[error("reading_value must be a finite number, got {0}")]
    NonFiniteValue(f64),
}

/// Result type alias using telemetra-types' validation error.
pub type ValidationResult<T> = std::result::Result<T, InvalidReading>;
