//! Shared types for the telemetra sensor reading service.
//!
//! This crate provides the data model used across the store and
//! service crates:
//!
//! - [`Reading`] - a persisted, timestamped observation
//! - [`NewReading`] / [`ReadingPatch`] - request payloads for CRUD
//! - [`RawReading`] - an untrusted reading-like record fed to the
//!   aggregation engine
//! - [`AggregationResult`] - per-device mean/median summary
//!
//! # Example
//!
//! ```
//! use telemetra_types::NewReading;
//!
//! let new = NewReading {
//!     device_name: "Temperature Sensor".to_string(),
//!     reading_value: 25.4,
//! };
//! assert!(new.validate().is_ok());
//! ```

pub mod error;
pub mod types;

pub use error::{InvalidReading, ValidationResult};
pub use types::{AggregationResult, NewReading, RawReading, Reading, ReadingPatch};
