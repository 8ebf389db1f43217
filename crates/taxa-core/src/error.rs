//! Error types for `taxa-core`, plus the coarse error taxonomy shared by every
//! store backend.

use thiserror::Error;

use crate::rank::Rank;

/// The four outcomes a caller can act on. Backends map their own failures onto
/// these so that transport layers never inspect driver errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  /// A referenced row does not exist.
  NotFound,
  /// A uniqueness or referential constraint would be violated.
  Conflict,
  /// The input was rejected before touching storage.
  Validation,
  /// Anything else the storage layer reported.
  Storage,
}

/// Implemented by every error type a [`crate::store::TaxonomyStore`] returns.
pub trait Classify {
  fn kind(&self) -> ErrorKind;
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("missing {0} name")]
  MissingName(Rank),

  #[error("{rank} requires a parent {parent}")]
  MissingParent { rank: Rank, parent: Rank },

  #[error("domain has no parent scope")]
  UnexpectedParent,

  #[error("{0} is not a grouping rank")]
  NotAGroupingRank(Rank),

  #[error("tag name must not be blank")]
  BlankTagName,

  #[error("cannot merge a tag into itself")]
  SelfMerge,

  #[error("table {table} has no column {column:?}")]
  UnknownColumn { table: String, column: String },

  #[error("table {table} column {column}: {reason}")]
  InvalidValue {
    table:  String,
    column: String,
    reason: String,
  },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Self::Serialization(_) => ErrorKind::Storage,
      _ => ErrorKind::Validation,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
