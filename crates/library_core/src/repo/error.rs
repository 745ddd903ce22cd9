use thiserror::Error;

use crate::db::DbError;
use crate::model::checker::ValidationError;
use crate::model::EntityId;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by every catalog repository.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: EntityId },
    /// The row changed (or vanished) since `version` was read.
    #[error("{entity} {id} was modified concurrently; stale version {version}")]
    OptimisticLock {
        entity: &'static str,
        id: EntityId,
        version: i16,
    },
    #[error("{entity} has not been persisted yet")]
    Transient { entity: &'static str },
    #[error("{entity} {id} is already persisted")]
    AlreadyPersisted { entity: &'static str, id: EntityId },
    #[error("invalid persisted data: {0}")]
    InvalidData(String),
    #[error("connection schema version {actual_version} does not match expected {expected_version}")]
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    #[error("required table `{0}` is missing")]
    MissingRequiredTable(&'static str),
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
