//! Error types for `tuplewatch-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A relation-tuple string is missing one of its required separators
  /// (`:`, `#`, or `@`).
  #[error("the relation tuple string is malformed")]
  InvalidRelationTuple,

  /// A subject-set string is not of the form `namespace:object#relation`.
  #[error("the subject set string is malformed")]
  InvalidSubjectSet,

  /// A snaptoken failed to decode. The reason distinguishes bad transport
  /// encoding from a bad snapshot payload.
  #[error("invalid snaptoken: {0}")]
  InvalidSnaptoken(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
