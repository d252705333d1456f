//! Application state shared across handlers.

use std::sync::Arc;

use telemetra_store::Store;
use tokio::sync::{Mutex, RwLock};

use crate::config::Config;

/// Shared application state.
///
/// The store is the only shared mutable resource in the system; the
/// aggregation engine is pure and needs no coordination. Handlers
/// acquire the store mutex briefly around database work and drop it
/// before serializing responses.
pub struct AppState {
    /// The data store (wrapped in Mutex for thread-safe access).
    pub store: Mutex<Store>,
    /// Configuration (RwLock for runtime reads from handlers).
    pub config: RwLock<Config>,
}

impl AppState {
    /// Create new application state.
    pub fn new(store: Store, config: Config) -> Arc<Self> {
        Arc::new(Self {
            store: Mutex::new(store),
            config: RwLock::new(config),
        })
    }
}
