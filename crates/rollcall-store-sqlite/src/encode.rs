//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings with microsecond
//! precision so that lexical order is chronological order. Service days are
//! `YYYY-MM-DD`. Identifiers are hyphenated lowercase UUIDs.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SecondsFormat, SubsecRound as _, Utc};
use rollcall_core::{
  attendance::{AttendanceRecord, Slot},
  id::{RecordId, ShiftId, StudentKey, SupervisorId},
  shift::{Shift, ShiftStatus},
  student::StudentProfile,
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

/// Drop precision the column cannot hold, so a value read back compares equal
/// to the value written.
pub fn canonical_dt(dt: DateTime<Utc>) -> DateTime<Utc> { dt.trunc_subsecs(6) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Closed sets ─────────────────────────────────────────────────────────────

fn decode_slot(s: &str) -> Result<Slot> {
  Slot::from_str(s).map_err(|_| Error::Decode(format!("unknown slot: {s:?}")))
}

fn decode_status(s: &str) -> Result<ShiftStatus> {
  ShiftStatus::from_str(s)
    .map_err(|_| Error::Decode(format!("unknown shift status: {s:?}")))
}

fn decode_supervisor(s: String) -> Result<SupervisorId> {
  SupervisorId::new(&s)
    .map_err(|_| Error::Decode(format!("invalid supervisor id: {s:?}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list shared by every `SELECT` that produces a [`RawShift`].
pub const SHIFT_COLUMNS: &str =
  "shift_id, supervisor_id, status, started_at, ended_at, scan_count";

/// Raw values read directly from a `shifts` row.
pub struct RawShift {
  pub shift_id:      String,
  pub supervisor_id: String,
  pub status:        String,
  pub started_at:    String,
  pub ended_at:      Option<String>,
  pub scan_count:    i64,
}

impl RawShift {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      shift_id:      row.get(0)?,
      supervisor_id: row.get(1)?,
      status:        row.get(2)?,
      started_at:    row.get(3)?,
      ended_at:      row.get(4)?,
      scan_count:    row.get(5)?,
    })
  }

  pub fn into_shift(self) -> Result<Shift> {
    Ok(Shift {
      shift_id:      ShiftId::from_str(&self.shift_id)?,
      supervisor_id: decode_supervisor(self.supervisor_id)?,
      status:        decode_status(&self.status)?,
      started_at:    decode_dt(&self.started_at)?,
      ended_at:      self.ended_at.as_deref().map(decode_dt).transpose()?,
      scan_count:    u64::try_from(self.scan_count).map_err(|_| {
        Error::Decode(format!("negative scan count {}", self.scan_count))
      })?,
    })
  }
}

/// Column list shared by every `SELECT` that produces a [`RawRecord`].
pub const RECORD_COLUMNS: &str = "record_id, student_key, service_date, slot, \
                                  shift_id, supervisor_id, check_in_time";

/// Raw strings read directly from an `attendance` row.
pub struct RawRecord {
  pub record_id:     String,
  pub student_key:   String,
  pub service_date:  String,
  pub slot:          String,
  pub shift_id:      String,
  pub supervisor_id: String,
  pub check_in_time: String,
}

impl RawRecord {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      record_id:     row.get(0)?,
      student_key:   row.get(1)?,
      service_date:  row.get(2)?,
      slot:          row.get(3)?,
      shift_id:      row.get(4)?,
      supervisor_id: row.get(5)?,
      check_in_time: row.get(6)?,
    })
  }

  /// Encode a record for insertion, in column order.
  pub fn from_record(record: &AttendanceRecord) -> Self {
    Self {
      record_id:     record.record_id.to_string(),
      student_key:   record.student_key.to_string(),
      service_date:  encode_date(record.date),
      slot:          record.slot.to_string(),
      shift_id:      record.shift_id.to_string(),
      supervisor_id: record.supervisor_id.to_string(),
      check_in_time: encode_dt(record.check_in_time),
    }
  }

  pub fn into_record(self) -> Result<AttendanceRecord> {
    Ok(AttendanceRecord {
      record_id:     RecordId::from_str(&self.record_id)?,
      student_key:   StudentKey::from_str(&self.student_key)?,
      date:          decode_date(&self.service_date)?,
      slot:          decode_slot(&self.slot)?,
      shift_id:      ShiftId::from_str(&self.shift_id)?,
      supervisor_id: decode_supervisor(self.supervisor_id)?,
      check_in_time: decode_dt(&self.check_in_time)?,
    })
  }
}

/// Raw strings read directly from a `students` row.
pub struct RawStudent {
  pub student_key: String,
  pub full_name:   String,
  pub email:       Option<String>,
  pub university:  Option<String>,
  pub phone:       Option<String>,
}

impl RawStudent {
  pub fn into_profile(self) -> Result<StudentProfile> {
    Ok(StudentProfile {
      student_key: StudentKey::from_str(&self.student_key)?,
      full_name:   self.full_name,
      email:       self.email,
      university:  self.university,
      phone:       self.phone,
    })
  }
}
