//! Error type for `rollcall-store-sqlite`.

use rollcall_core::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A column held a value outside its closed set.
  #[error("unexpected column value: {0}")]
  Decode(String),

  /// A uniqueness index the invariants depend on is absent.
  #[error("required unique index {0:?} is missing")]
  MissingConstraint(&'static str),

  /// The database contradicted itself mid-transaction.
  #[error("inconsistent store state: {0}")]
  Inconsistent(String),

  #[error("invalid student row: {0}")]
  InvalidStudent(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl StoreError for Error {
  fn is_integrity_violation(&self) -> bool {
    matches!(
      self,
      Self::Uuid(_)
        | Self::DateParse(_)
        | Self::Decode(_)
        | Self::MissingConstraint(_)
        | Self::Inconsistent(_)
    )
  }
}
