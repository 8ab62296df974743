//! Error types for the rollcall-token codec.

use rollcall_core::id::StudentKey;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("malformed token: {0}")]
  Malformed(String),

  #[error("unsupported token version: {0:?}")]
  UnsupportedVersion(String),

  #[error("token signature does not verify")]
  BadSignature,

  #[error("token subject {0} is not a known student")]
  UnknownSubject(StudentKey),

  #[error("token secret must be at least {min} bytes, got {got}")]
  WeakSecret { min: usize, got: usize },

  #[error("student directory: {0}")]
  Directory(rollcall_core::Error),

  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<Error> for rollcall_core::Error {
  fn from(err: Error) -> Self {
    match err {
      Error::UnknownSubject(key) => Self::UnknownSubject(key),
      Error::Directory(inner) => inner,
      other @ (Error::Malformed(_)
      | Error::UnsupportedVersion(_)
      | Error::BadSignature
      | Error::WeakSecret { .. }
      | Error::Json(_)) => Self::MalformedToken(other.to_string()),
    }
  }
}
