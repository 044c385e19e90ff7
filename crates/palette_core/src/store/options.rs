//! Store configuration.

use crate::db::DEFAULT_BUSY_TIMEOUT;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Where the durable half of the store lives.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreLocation {
    /// Private in-memory database, gone when the store is dropped.
    InMemory,
    /// SQLite database file, created when missing.
    File(PathBuf),
}

/// Options for `Store::open`.
///
/// `busy_timeout_ms` applies to both locations.
///
/// Deserializes from e.g. `{"location": {"file": "/data/colors.db"}}`;
/// missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    pub location: StoreLocation,
    pub busy_timeout_ms: u64,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            location: StoreLocation::InMemory,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT.as_millis() as u64,
        }
    }
}

impl StoreOptions {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            location: StoreLocation::File(path.into()),
            ..Self::default()
        }
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}
