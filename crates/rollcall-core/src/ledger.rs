//! [`AttendanceLedger`], owner of the at-most-once admission invariant.
//!
//! For a given `(student, service day, slot)` there is at most one
//! [`AttendanceRecord`], whichever shift or supervisor wrote it. The ledger
//! never checks for an existing record before writing; it hands the whole
//! decision to [`AttendanceStore::insert_record`], which is a single
//! conditional write guarded by the store's uniqueness constraint.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{error, info};

use crate::{
  Error, Result,
  attendance::{AdmissionEvent, AttendanceRecord, EventSink, NoopEvents, Slot},
  calendar::ServiceCalendar,
  id::{RecordId, ShiftId, StudentKey, SupervisorId},
  store::{AttendanceStore, InsertOutcome},
};

/// The outcome of [`AttendanceLedger::admit`]. Both arms are normal results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
  /// This call created the record.
  Admitted(AttendanceRecord),
  /// The key was already taken; carries the record that holds it.
  Rejected(AttendanceRecord),
}

impl Admission {
  pub fn record(&self) -> &AttendanceRecord {
    match self {
      Self::Admitted(r) | Self::Rejected(r) => r,
    }
  }

  pub fn is_admitted(&self) -> bool { matches!(self, Self::Admitted(_)) }
}

pub struct AttendanceLedger<S> {
  store:    Arc<S>,
  calendar: ServiceCalendar,
  events:   Arc<dyn EventSink>,
}

impl<S> Clone for AttendanceLedger<S> {
  fn clone(&self) -> Self {
    Self {
      store:    Arc::clone(&self.store),
      calendar: self.calendar,
      events:   Arc::clone(&self.events),
    }
  }
}

impl<S: AttendanceStore> AttendanceLedger<S> {
  pub fn new(store: Arc<S>, calendar: ServiceCalendar) -> Self {
    Self { store, calendar, events: Arc::new(NoopEvents) }
  }

  /// Publish an [`AdmissionEvent`] to `events` after every admission.
  pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
    self.events = events;
    self
  }

  pub fn calendar(&self) -> ServiceCalendar { self.calendar }

  /// Admit `student` for `slot` on service day `date` under `shift_id`.
  ///
  /// Conflict-idempotent: retrying after a timeout either commits once or
  /// returns [`Admission::Rejected`] carrying the caller's own earlier record
  /// (see [`AttendanceRecord::is_owned_by`]).
  ///
  /// Fails with [`Error::InvalidDate`] for days after the current service day,
  /// with [`Error::ShiftClosed`] / [`Error::ShiftNotFound`] if the shift is not
  /// open when the write commits, and with [`Error::Integrity`] if the store
  /// reports a conflict without exactly one holder of the key.
  pub async fn admit(
    &self,
    student: StudentKey,
    date: NaiveDate,
    slot: Slot,
    shift_id: ShiftId,
    supervisor: &SupervisorId,
    now: DateTime<Utc>,
  ) -> Result<Admission> {
    let today = self.calendar.day_of(now);
    if date > today {
      return Err(Error::InvalidDate { date, today });
    }

    let record = AttendanceRecord {
      record_id: RecordId::new(),
      student_key: student,
      date,
      slot,
      shift_id,
      supervisor_id: supervisor.clone(),
      check_in_time: now,
    };

    let outcome = self
      .store
      .insert_record(record)
      .await
      .map_err(Error::from_store)?;

    match outcome {
      InsertOutcome::Inserted(record) => {
        info!(
          student = %record.student_key,
          %date,
          %slot,
          shift = %shift_id,
          supervisor = %supervisor,
          "admitted"
        );
        self.events.publish(AdmissionEvent::from(&record));
        Ok(Admission::Admitted(record))
      }
      InsertOutcome::Conflict(existing) => {
        let existing = single_holder(existing, student, date, slot)?;
        info!(
          student = %student,
          %date,
          %slot,
          shift = %shift_id,
          original_shift = %existing.shift_id,
          original_supervisor = %existing.supervisor_id,
          "admission rejected, already checked in"
        );
        Ok(Admission::Rejected(existing))
      }
      InsertOutcome::ShiftClosed => Err(Error::ShiftClosed(shift_id)),
      InsertOutcome::ShiftMissing => Err(Error::ShiftNotFound(shift_id)),
    }
  }

  /// The record holding `(student, date, slot)`, if any.
  pub async fn lookup(
    &self,
    student: StudentKey,
    date: NaiveDate,
    slot: Slot,
  ) -> Result<Option<AttendanceRecord>> {
    let found = self
      .store
      .find_records(student, date, slot)
      .await
      .map_err(Error::from_store)?;
    if found.is_empty() {
      return Ok(None);
    }
    single_holder(found, student, date, slot).map(Some)
  }

  /// Every record for one service day.
  pub async fn records_on(&self, date: NaiveDate) -> Result<Vec<AttendanceRecord>> {
    self.records_between(date, date).await
  }

  /// Every record whose service day lies in `from..=to`.
  pub async fn records_between(
    &self,
    from: NaiveDate,
    to: NaiveDate,
  ) -> Result<Vec<AttendanceRecord>> {
    if from > to {
      return Err(Error::InvalidRange { from, to });
    }
    self
      .store
      .records_between(from, to)
      .await
      .map_err(Error::from_store)
  }

  pub async fn records_for_shift(
    &self,
    shift_id: ShiftId,
  ) -> Result<Vec<AttendanceRecord>> {
    self
      .store
      .records_for_shift(shift_id)
      .await
      .map_err(Error::from_store)
  }
}

/// Reduce the holders of a key to the single record the invariant allows.
/// Zero or several holders is never papered over by picking one.
fn single_holder(
  mut holders: Vec<AttendanceRecord>,
  student: StudentKey,
  date: NaiveDate,
  slot: Slot,
) -> Result<AttendanceRecord> {
  match holders.len() {
    1 => Ok(holders.remove(0)),
    n => {
      error!(
        student = %student,
        %date,
        %slot,
        holders = n,
        "attendance key held by {n} records, halting admission for this key"
      );
      Err(Error::Integrity(format!(
        "{n} attendance records for student {student} on {date} slot {slot}"
      )))
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn record(student: StudentKey) -> AttendanceRecord {
    AttendanceRecord {
      record_id:     RecordId::new(),
      student_key:   student,
      date:          NaiveDate::from_ymd_opt(2025, 9, 26).unwrap(),
      slot:          Slot::First,
      shift_id:      ShiftId::new(),
      supervisor_id: SupervisorId::new("sup-a").unwrap(),
      check_in_time: Utc.with_ymd_and_hms(2025, 9, 26, 7, 0, 0).unwrap(),
    }
  }

  #[test]
  fn single_holder_accepts_exactly_one() {
    let student = StudentKey::new();
    let r = record(student);
    let held = single_holder(vec![r.clone()], student, r.date, r.slot).unwrap();
    assert_eq!(held, r);
  }

  #[test]
  fn single_holder_refuses_to_pick_among_many() {
    let student = StudentKey::new();
    let a = record(student);
    let b = record(student);
    let err = single_holder(vec![a.clone(), b], student, a.date, a.slot)
      .unwrap_err();
    assert!(matches!(err, Error::Integrity(_)));
  }

  #[test]
  fn single_holder_refuses_phantom_conflict() {
    let student = StudentKey::new();
    let date = NaiveDate::from_ymd_opt(2025, 9, 26).unwrap();
    let err = single_holder(vec![], student, date, Slot::Second).unwrap_err();
    assert!(matches!(err, Error::Integrity(_)));
  }
}
