//! SQLite backend for the durable half of the store.
//!
//! # Responsibility
//! - Open and configure SQLite connections.
//! - Bootstrap the `color_items` schema before the store touches data.
//!
//! # Invariants
//! - Reads through a returned connection only ever see committed rows.
//! - Schema version is tracked via `PRAGMA user_version`.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod open;
pub mod schema;

pub use open::{
    open_db, open_db_in_memory, open_db_in_memory_with_timeout, open_db_with_timeout,
    DEFAULT_BUSY_TIMEOUT,
};

pub type DbResult<T> = Result<T, DbError>;

/// Failure while opening a store database or bringing its schema up.
#[derive(Debug)]
pub enum DbError {
    /// Connection-level SQLite failure (open, pragma, version read).
    Sqlite(rusqlite::Error),
    /// `user_version` is ahead of what this build can read.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// The schema statements for `version` could not be applied; nothing
    /// from that attempt was kept.
    SchemaApply {
        version: u32,
        source: rusqlite::Error,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite: {err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::SchemaApply { version, source } => {
                write!(f, "failed to apply schema version {version}: {source}")
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) | Self::SchemaApply { source: err, .. } => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
