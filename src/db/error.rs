use deadpool_postgres::{BuildError, PoolError};
use thiserror::Error;

// DbError is the lowest level error type, wrapping errors from the database layer. It does not wrap
// any higher level errors.
#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Pg(#[from] tokio_postgres::Error),

    #[error(transparent)]
    Migrate(#[from] refinery::Error),

    #[error(transparent)]
    Build(#[from] BuildError),
}
