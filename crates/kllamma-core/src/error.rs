use std::time::Duration;

use kllamma_db::DbError;
use kllamma_refiner::RefinerError;
use thiserror::Error;

/// Failures surfaced by the services, one variant per response class.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Prompt refinement timed out after {0:?}")]
    RefinerTimeout(Duration),

    #[error(transparent)]
    Refiner(RefinerError),

    #[error(transparent)]
    Database(#[from] DbError),
}

impl From<RefinerError> for ServiceError {
    fn from(err: RefinerError) -> Self {
        match err {
            RefinerError::Timeout(after) => ServiceError::RefinerTimeout(after),
            other => ServiceError::Refiner(other),
        }
    }
}

impl From<kllamma_db::SqliteError> for ServiceError {
    fn from(err: kllamma_db::SqliteError) -> Self {
        ServiceError::Database(DbError::from(err))
    }
}
