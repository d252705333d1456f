//! Error types for telemetra-aggregate.

use thiserror::Error;

/// Result type for telemetra-aggregate operations.
pub type Result<T> = std::result::Result<T, AggregateError>;

/// Errors that can occur while aggregating a batch of readings.
///
/// Validation failure is the only defined failure mode: it is reported
/// synchronously to the caller, never retried and never swallowed.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AggregateError {
    /// Required fields are absent from the batch schema.
    ///
    /// A field is part of the batch schema when at least one element
    /// declares it. An empty batch declares nothing, so it fails with
    /// all required fields missing.
    #[error(
        "invalid sensor data: required fields missing from batch: {}",
        missing_fields.join(", ")
    )]
    MissingFields {
        /// The required fields that no element declared.
        missing_fields: Vec<String>,
    },
}

impl AggregateError {
    /// The missing field names, if this is a schema failure.
    pub fn missing_fields(&self) -> &[String] {
        match self {
            AggregateError::MissingFields { missing_fields } => missing_fields,
        }
    }
}
