//! Local data persistence for telemetra sensor readings.
//!
//! This crate provides SQLite-based storage for individual sensor
//! readings: plain keyed CRUD plus filtered queries. Aggregation never
//! goes through the store; it consumes a transient batch handed to it
//! by the service.
//!
//! # Features
//!
//! - Store readings with server-assigned timestamps
//! - Full CRUD by row id
//! - Query by device, time range, with pagination
//!
//! # Example
//!
//! ```no_run
//! use telemetra_store::{ReadingQuery, Store};
//!
//! let store = Store::open_default()?;
//!
//! // Query recent readings for one device
//! let query = ReadingQuery::new()
//!     .device("Temperature Sensor")
//!     .limit(10);
//! let readings = store.query_readings(&query)?;
//! # Ok::<(), telemetra_store::Error>(())
//! ```

mod error;
mod queries;
mod schema;
mod store;

pub use error::{Error, Result};
pub use queries::ReadingQuery;
pub use store::Store;

/// Default database path following platform conventions.
///
/// - Linux: `~/.local/share/telemetra/data.db`
/// - macOS: `~/Library/Application Support/telemetra/data.db`
/// - Windows: `C:\Users\<user>\AppData\Local\telemetra\data.db`
pub fn default_db_path() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("telemetra")
        .join("data.db")
}
