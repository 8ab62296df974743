//! Error types for `rollcall-core`.
//!
//! Duplicate admissions are deliberately absent: a second scan of the same
//! student in the same slot is a normal [`Admission::Rejected`] outcome, not
//! an error.
//!
//! [`Admission::Rejected`]: crate::ledger::Admission::Rejected

use chrono::NaiveDate;
use thiserror::Error;

use crate::{
  id::{ShiftId, StudentKey, SupervisorId},
  store::StoreError,
};

#[derive(Debug, Error)]
pub enum Error {
  #[error("malformed token: {0}")]
  MalformedToken(String),

  #[error("unknown student: {0}")]
  UnknownSubject(StudentKey),

  #[error("invalid slot: {0:?}")]
  InvalidSlot(String),

  #[error("invalid date {date}: service day is {today}")]
  InvalidDate { date: NaiveDate, today: NaiveDate },

  #[error("invalid date range: {from} is after {to}")]
  InvalidRange { from: NaiveDate, to: NaiveDate },

  #[error("invalid supervisor id: {0:?}")]
  InvalidSupervisor(String),

  #[error("invalid UTC offset: {0:?}")]
  InvalidUtcOffset(String),

  #[error("supervisor {0} has no open shift")]
  NoOpenShift(SupervisorId),

  #[error("shift {0} is closed")]
  ShiftClosed(ShiftId),

  #[error("shift not found: {0}")]
  ShiftNotFound(ShiftId),

  #[error("shift {shift} does not belong to supervisor {supervisor}")]
  ShiftNotOwned {
    shift:      ShiftId,
    supervisor: SupervisorId,
  },

  #[error("store unavailable: {0}")]
  StoreUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("integrity violation: {0}")]
  Integrity(String),
}

/// Coarse classification used by callers to pick a reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  /// The caller sent something it can correct; never retried.
  Client,
  /// Infrastructure hiccup; the whole operation is safe to retry.
  Transient,
  /// The store no longer upholds an invariant. Admission for the affected key
  /// must stop until an operator intervenes.
  Integrity,
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::StoreUnavailable(_) => ErrorKind::Transient,
      Self::Integrity(_) => ErrorKind::Integrity,
      _ => ErrorKind::Client,
    }
  }

  pub fn is_retryable(&self) -> bool { self.kind() == ErrorKind::Transient }

  /// Classify a backend error.
  pub fn from_store<E: StoreError>(err: E) -> Self {
    if err.is_integrity_violation() {
      Self::Integrity(err.to_string())
    } else {
      Self::StoreUnavailable(Box::new(err))
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[derive(Debug, Error)]
  #[error("fake store error (integrity: {0})")]
  struct FakeStoreError(bool);

  impl StoreError for FakeStoreError {
    fn is_integrity_violation(&self) -> bool { self.0 }
  }

  #[test]
  fn store_errors_are_classified() {
    let transient = Error::from_store(FakeStoreError(false));
    assert_eq!(transient.kind(), ErrorKind::Transient);
    assert!(transient.is_retryable());

    let broken = Error::from_store(FakeStoreError(true));
    assert_eq!(broken.kind(), ErrorKind::Integrity);
    assert!(!broken.is_retryable());
  }

  #[test]
  fn input_errors_are_client_errors() {
    assert_eq!(Error::InvalidSlot("third".into()).kind(), ErrorKind::Client);
    assert_eq!(
      Error::ShiftClosed(ShiftId::new()).kind(),
      ErrorKind::Client
    );
    assert!(!Error::MalformedToken("x".into()).is_retryable());
  }
}
