//! Color record repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide row-level writes used by store commits.
//! - Provide committed-state reads used by fetches and attribute lookups.
//!
//! # Invariants
//! - `seq` reflects first-commit order and is never rewritten.
//! - Update and delete of a missing row report `NotFound`.

use crate::db::DbError;
use crate::query::fetch::FetchRequest;
use rusqlite::{params, Connection, OptionalExtension};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for color row persistence and queries.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound(Uuid),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(uuid) => write!(f, "color item not found: {uuid}"),
            Self::InvalidData(message) => write!(f, "invalid persisted color data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Row-level access to durable color records.
pub trait ColorItemRepository {
    fn insert(&self, uuid: Uuid, hex: &str) -> RepoResult<()>;
    fn update_hex(&self, uuid: Uuid, hex: &str) -> RepoResult<()>;
    fn delete(&self, uuid: Uuid) -> RepoResult<()>;
    fn get_hex(&self, uuid: Uuid) -> RepoResult<Option<String>>;
    fn count(&self) -> RepoResult<usize>;
    fn list(&self, request: &FetchRequest) -> RepoResult<Vec<Uuid>>;
}

/// SQLite-backed color repository.
///
/// Works on a plain connection or, through deref, on an open transaction.
pub struct SqliteColorItemRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteColorItemRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ColorItemRepository for SqliteColorItemRepository<'_> {
    fn insert(&self, uuid: Uuid, hex: &str) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO color_items (uuid, hex) VALUES (?1, ?2);",
            params![uuid.to_string(), hex],
        )?;
        Ok(())
    }

    fn update_hex(&self, uuid: Uuid, hex: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE color_items SET hex = ?1 WHERE uuid = ?2;",
            params![hex, uuid.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(uuid));
        }
        Ok(())
    }

    fn delete(&self, uuid: Uuid) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM color_items WHERE uuid = ?1;", [uuid.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound(uuid));
        }
        Ok(())
    }

    fn get_hex(&self, uuid: Uuid) -> RepoResult<Option<String>> {
        let hex = self
            .conn
            .query_row(
                "SELECT hex FROM color_items WHERE uuid = ?1;",
                [uuid.to_string()],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(hex)
    }

    fn count(&self) -> RepoResult<usize> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM color_items;", [], |row| {
                row.get::<_, i64>(0)
            })?;
        usize::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative row count `{count}`")))
    }

    fn list(&self, request: &FetchRequest) -> RepoResult<Vec<Uuid>> {
        let sql = format!("SELECT uuid FROM color_items {};", request.order_by_sql());
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut ids = Vec::new();

        while let Some(row) = rows.next()? {
            let uuid_text: String = row.get(0)?;
            let uuid = Uuid::parse_str(&uuid_text).map_err(|_| {
                RepoError::InvalidData(format!(
                    "invalid uuid value `{uuid_text}` in color_items.uuid"
                ))
            })?;
            ids.push(uuid);
        }

        Ok(ids)
    }
}
