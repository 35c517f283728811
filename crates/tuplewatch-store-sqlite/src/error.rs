//! Error type for `tuplewatch-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A stored row no longer decodes into a domain value (e.g. a
  /// relation-tuple column that fails the grammar).
  #[error("core error: {0}")]
  Core(#[from] tuplewatch_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
