//! Attendance records: the system of record for who was admitted when.
//!
//! A record is written exactly once by the ledger and never updated. The
//! `(student_key, date, slot)` triple is unique across the whole store.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::{
  Error, Result,
  id::{RecordId, ShiftId, StudentKey, SupervisorId},
};

// ─── Slot ────────────────────────────────────────────────────────────────────

/// A named appointment window within a service day.
///
/// Parsing is case-insensitive and ignores surrounding whitespace; this is the
/// only place a slot string is ever interpreted.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumIter,
  EnumString,
)]
#[serde(rename_all = "lowercase", try_from = "String")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Slot {
  First,
  Second,
}

impl Slot {
  pub fn parse(raw: &str) -> Result<Self> {
    Self::from_str(raw.trim()).map_err(|_| Error::InvalidSlot(raw.to_owned()))
  }
}

impl TryFrom<String> for Slot {
  type Error = Error;

  fn try_from(value: String) -> Result<Self> { Self::parse(&value) }
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// One admitted check-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
  pub record_id:     RecordId,
  pub student_key:   StudentKey,
  /// Service day in the canonical time zone.
  pub date:          NaiveDate,
  pub slot:          Slot,
  pub shift_id:      ShiftId,
  pub supervisor_id: SupervisorId,
  pub check_in_time: DateTime<Utc>,
}

impl AttendanceRecord {
  /// Whether this record was written under the given shift by the given
  /// supervisor, i.e. a retry observing its own earlier commit.
  pub fn is_owned_by(&self, shift_id: ShiftId, supervisor: &SupervisorId) -> bool {
    self.shift_id == shift_id && &self.supervisor_id == supervisor
  }
}

// ─── Events ──────────────────────────────────────────────────────────────────

/// Published after every successful admission for read-side consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionEvent {
  pub record_id:     RecordId,
  pub student_key:   StudentKey,
  pub shift_id:      ShiftId,
  pub slot:          Slot,
  pub date:          NaiveDate,
  pub check_in_time: DateTime<Utc>,
}

impl From<&AttendanceRecord> for AdmissionEvent {
  fn from(record: &AttendanceRecord) -> Self {
    Self {
      record_id:     record.record_id,
      student_key:   record.student_key,
      shift_id:      record.shift_id,
      slot:          record.slot,
      date:          record.date,
      check_in_time: record.check_in_time,
    }
  }
}

/// Fire-and-forget consumer of [`AdmissionEvent`]s.
///
/// Called after the admission has committed. Implementations must not block
/// and cannot fail the admission.
pub trait EventSink: Send + Sync {
  fn publish(&self, event: AdmissionEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEvents;

impl EventSink for NoopEvents {
  fn publish(&self, _event: AdmissionEvent) {}
}

#[cfg(test)]
mod tests {
  use strum::IntoEnumIterator as _;

  use super::*;

  #[test]
  fn slot_parsing_is_uniform() {
    assert_eq!(Slot::parse("first").unwrap(), Slot::First);
    assert_eq!(Slot::parse("  SECOND\n").unwrap(), Slot::Second);
    assert_eq!(Slot::parse("First").unwrap(), Slot::First);
    assert!(matches!(Slot::parse("third"), Err(Error::InvalidSlot(_))));
    assert!(matches!(Slot::parse(""), Err(Error::InvalidSlot(_))));
  }

  #[test]
  fn slot_serde_goes_through_parse() {
    let slot: Slot = serde_json::from_str("\"Second\"").unwrap();
    assert_eq!(slot, Slot::Second);
    assert_eq!(serde_json::to_string(&Slot::First).unwrap(), "\"first\"");
    assert!(serde_json::from_str::<Slot>("\"morning\"").is_err());
  }

  #[test]
  fn slot_display_matches_storage_form() {
    let names: Vec<String> = Slot::iter().map(|s| s.to_string()).collect();
    assert_eq!(names, ["first", "second"]);
    assert_eq!(Slot::Second.as_ref(), "second");
  }
}
