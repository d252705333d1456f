//! HTTP REST API for ingesting and aggregating sensor readings.
//!
//! This crate provides a service that:
//! - Persists individual sensor readings in a local database
//! - Exposes standard CRUD endpoints for readings
//! - Computes per-device mean/median summaries on demand
//! - Optionally exports aggregation snapshots for a legacy batch tool
//!
//! # REST API Endpoints
//!
//! - `GET /api/health` - Service health check
//! - `GET /api/test-cors` - CORS reachability check
//! - `GET /api/readings` - List readings (filters: device, since, until, limit, offset)
//! - `POST /api/readings` - Create a reading (timestamp is server-assigned)
//! - `GET /api/readings/{id}` - Get one reading
//! - `PUT /api/readings/{id}` - Fully replace device name and value
//! - `PATCH /api/readings/{id}` - Partial update
//! - `DELETE /api/readings/{id}` - Delete a reading
//! - `GET /api/sensor-data` - All readings wrapped as `{"sensor_data": [...]}`
//! - `POST /api/sensor-data` - Aggregate a submitted batch
//! - `POST /api/sensor-data/process` - Aggregate a bare JSON list body
//!
//! # Configuration
//!
//! The service reads configuration from `~/.config/telemetra/server.toml`:
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:8080"
//!
//! [storage]
//! path = "~/.local/share/telemetra/data.db"
//!
//! [export]
//! enabled = false
//! dir = "/var/lib/telemetra/snapshots"
//! command = "process-tables"
//! timeout_secs = 30
//! ```
//!
//! Snapshot export is a fire-and-forget side-channel: it runs after an
//! aggregation response has been computed and can never fail or delay
//! the response.

pub mod api;
pub mod config;
pub mod export;
pub mod state;

pub use config::{Config, ConfigError, ExportConfig, ServerConfig, StorageConfig};
pub use state::AppState;
