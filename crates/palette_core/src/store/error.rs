//! Store error taxonomy.

use crate::db::DbError;
use crate::model::color_item::{ColorItemValidationError, ObjectId};
use crate::repo::color_repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure of `Store::commit_if_dirty`. Nothing was persisted.
#[derive(Debug)]
pub enum CommitError {
    /// A pending record failed validation before any write.
    Validation(ColorItemValidationError),
    /// The backend rejected the write; the transaction was rolled back.
    Persistence(RepoError),
}

impl Display for CommitError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "commit rejected: {err}"),
            Self::Persistence(err) => write!(f, "commit failed: {err}"),
        }
    }
}

impl Error for CommitError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Persistence(err) => Some(err),
        }
    }
}

impl From<ColorItemValidationError> for CommitError {
    fn from(value: ColorItemValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for CommitError {
    fn from(value: RepoError) -> Self {
        Self::Persistence(value)
    }
}

impl From<rusqlite::Error> for CommitError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Persistence(RepoError::from(value))
    }
}

/// Error for store operations other than the commit itself.
#[derive(Debug)]
pub enum StoreError {
    /// Record belongs to another context, or is unknown / already deleted here.
    InvalidReference(ObjectId),
    Commit(CommitError),
    Db(DbError),
    Repo(RepoError),
    /// Operation not allowed in the current state of the target.
    InvalidState(&'static str),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidReference(id) => {
                write!(f, "record {id} is not owned by this store context")
            }
            Self::Commit(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InvalidState(details) => write!(f, "invalid store state: {details}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Commit(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::InvalidReference(_) | Self::InvalidState(_) => None,
        }
    }
}

impl From<CommitError> for StoreError {
    fn from(value: CommitError) -> Self {
        Self::Commit(value)
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<RepoError> for StoreError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}
