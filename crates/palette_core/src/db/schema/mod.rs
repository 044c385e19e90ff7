//! Schema bootstrap for the color store.
//!
//! # Invariants
//! - The schema statements are idempotent (`IF NOT EXISTS`).
//! - The applied version is mirrored to `PRAGMA user_version`.
//! - Databases written by a newer build are rejected, never rewritten.

use crate::db::{DbError, DbResult};
use rusqlite::Connection;

const SCHEMA_SQL: &str = include_str!("0001_color_items.sql");

/// Schema version written by this build.
pub const SCHEMA_VERSION: u32 = 1;

/// Creates the store tables when missing and stamps the schema version.
pub fn ensure_schema(conn: &mut Connection) -> DbResult<()> {
    let current = user_version(conn)?;
    if current > SCHEMA_VERSION {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current,
            latest_supported: SCHEMA_VERSION,
        });
    }
    if current == SCHEMA_VERSION {
        return Ok(());
    }

    let apply = |source| DbError::SchemaApply {
        version: SCHEMA_VERSION,
        source,
    };
    let tx = conn.transaction()?;
    tx.execute_batch(SCHEMA_SQL).map_err(apply)?;
    tx.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION};"))
        .map_err(apply)?;
    tx.commit().map_err(apply)?;
    Ok(())
}

/// Reads `PRAGMA user_version`.
pub fn user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}
