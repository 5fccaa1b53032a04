//! Store configuration.

use serde::Deserialize;

/// In-memory store settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Buffered insertion notifications per subscriber before it lags.
    pub notification_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            notification_capacity: 1024,
        }
    }
}
