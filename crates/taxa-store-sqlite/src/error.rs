//! Error type for `taxa-store-sqlite`.

use taxa_core::{Classify, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] taxa_core::Error),

  #[error("database error: {0}")]
  Database(rusqlite::Error),

  #[error("connection error: {0}")]
  Connection(tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A referenced row (parent rank, species, tag) does not exist.
  #[error("{0} not found")]
  NotFound(String),

  /// A uniqueness or foreign-key constraint rejected the write.
  #[error("conflict: {0}")]
  Conflict(String),
}

impl From<rusqlite::Error> for Error {
  fn from(e: rusqlite::Error) -> Self {
    if e.sqlite_error_code() == Some(rusqlite::ErrorCode::ConstraintViolation) {
      Error::Conflict(e.to_string())
    } else {
      Error::Database(e)
    }
  }
}

/// Unwraps errors raised inside [`tokio_rusqlite::Connection::call`]. Our own
/// errors travel through the connection thread boxed in `Other`.
impl From<tokio_rusqlite::Error> for Error {
  fn from(e: tokio_rusqlite::Error) -> Self {
    match e {
      tokio_rusqlite::Error::Rusqlite(e) => e.into(),
      tokio_rusqlite::Error::Other(boxed) => match boxed.downcast::<Error>() {
        Ok(ours) => *ours,
        Err(other) => Error::Connection(tokio_rusqlite::Error::Other(other)),
      },
      other => Error::Connection(other),
    }
  }
}

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Error::Core(e) => e.kind(),
      Error::NotFound(_) => ErrorKind::NotFound,
      Error::Conflict(_) => ErrorKind::Conflict,
      Error::Database(_)
      | Error::Connection(_)
      | Error::Json(_)
      | Error::Uuid(_)
      | Error::DateParse(_) => ErrorKind::Storage,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
