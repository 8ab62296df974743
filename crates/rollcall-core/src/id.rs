//! Identifier newtypes.
//!
//! Every identifier that takes part in an admission decision gets its own
//! type so a shift id can never be compared against a student key by accident.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Error;

macro_rules! uuid_id {
  ($(#[$meta:meta])* $name:ident) => {
    $(#[$meta])*
    #[derive(
      Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
      Deserialize,
    )]
    #[serde(transparent)]
    pub struct $name(Uuid);

    impl $name {
      /// Generate a fresh random identifier.
      pub fn new() -> Self { Self(Uuid::new_v4()) }
    }

    impl Default for $name {
      fn default() -> Self { Self::new() }
    }

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
      }
    }

    impl FromStr for $name {
      type Err = uuid::Error;

      fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
      }
    }
  };
}

uuid_id! {
  /// The canonical identity of a student. The only field any admission check
  /// ever compares; emails and display names are descriptive only.
  StudentKey
}

uuid_id! {
  /// Identifies one supervisor work session.
  ShiftId
}

uuid_id! {
  /// Identifies one admitted attendance record.
  RecordId
}

// ─── SupervisorId ────────────────────────────────────────────────────────────

const SUPERVISOR_ID_MAX_LEN: usize = 128;

/// An already-authenticated supervisor identity, handed to the core by the
/// authentication layer. Opaque to the core apart from basic shape checks.
#[derive(
  Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct SupervisorId(String);

impl SupervisorId {
  /// Validate and wrap a supervisor identifier. Surrounding whitespace is
  /// trimmed; empty, oversized, or control-character ids are rejected.
  pub fn new(raw: impl AsRef<str>) -> Result<Self, Error> {
    let trimmed = raw.as_ref().trim();
    if trimmed.is_empty()
      || trimmed.len() > SUPERVISOR_ID_MAX_LEN
      || trimmed.chars().any(char::is_control)
    {
      return Err(Error::InvalidSupervisor(raw.as_ref().to_owned()));
    }
    Ok(Self(trimmed.to_owned()))
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl TryFrom<String> for SupervisorId {
  type Error = Error;

  fn try_from(value: String) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<SupervisorId> for String {
  fn from(id: SupervisorId) -> Self { id.0 }
}

impl fmt::Display for SupervisorId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn supervisor_id_is_trimmed() {
    let id = SupervisorId::new("  sup-7 \n").unwrap();
    assert_eq!(id.as_str(), "sup-7");
  }

  #[test]
  fn supervisor_id_rejects_blank_and_control_chars() {
    assert!(matches!(
      SupervisorId::new("   "),
      Err(Error::InvalidSupervisor(_))
    ));
    assert!(SupervisorId::new("a\u{0007}b").is_err());
    assert!(SupervisorId::new("x".repeat(SUPERVISOR_ID_MAX_LEN + 1)).is_err());
  }

  #[test]
  fn supervisor_id_deserialises_through_validation() {
    let ok: SupervisorId = serde_json::from_str("\"sup-1\"").unwrap();
    assert_eq!(ok.as_str(), "sup-1");
    assert!(serde_json::from_str::<SupervisorId>("\"\"").is_err());
  }

  #[test]
  fn student_key_parses_with_whitespace() {
    let key = StudentKey::new();
    let parsed: StudentKey = format!(" {key}\n").parse().unwrap();
    assert_eq!(parsed, key);
  }
}
