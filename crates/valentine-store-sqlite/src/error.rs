//! Error type for `valentine-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("storage key must not be empty")]
  EmptyKey,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
