//! Storage traits.
//!
//! Implemented by storage backends (e.g. `rollcall-store-sqlite`). The ledger
//! and the shift manager depend on these abstractions, never on a concrete
//! backend.
//!
//! Every mutating method is a single conditional write in the backend. None of
//! them may be emulated with a read followed by a separate write: the service
//! runs as several independent processes and the store is the only place the
//! invariants can be enforced.

use std::future::Future;

use chrono::{DateTime, NaiveDate, Utc};

use crate::{
  attendance::{AttendanceRecord, Slot},
  id::{ShiftId, StudentKey, SupervisorId},
  shift::{Closing, Shift, Started},
  student::StudentProfile,
};

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Implemented by every backend error type so the core can tell a transient
/// failure from a broken invariant.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  /// The backend is missing a constraint, or holds data that violates one.
  fn is_integrity_violation(&self) -> bool;
}

/// Shared by all store traits so a single backend has one error type.
pub trait Store: Send + Sync {
  type Error: StoreError;
}

// ─── Write outcomes ──────────────────────────────────────────────────────────

/// Outcome of the atomic admission write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
  /// The record was inserted and the shift counter incremented in the same
  /// transaction.
  Inserted(AttendanceRecord),
  /// The `(student, date, slot)` key was taken. Carries every record found
  /// under the key, read inside the same transaction; anything other than
  /// exactly one is an integrity problem for the caller to surface.
  Conflict(Vec<AttendanceRecord>),
  /// The shift exists but is closed. Nothing was written.
  ShiftClosed,
  /// The shift does not exist. Nothing was written.
  ShiftMissing,
}

/// Outcome of an atomic scan-counter increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counted {
  /// The counter value after the increment.
  Recorded(u64),
  ShiftClosed,
  ShiftMissing,
}

// ─── Traits ──────────────────────────────────────────────────────────────────

/// Persistence for supervisor shifts.
pub trait ShiftStore: Store {
  /// Persist `shift` as the supervisor's open shift, unless the supervisor
  /// already has one, in which case the existing shift is returned untouched.
  fn open_shift(
    &self,
    shift: Shift,
  ) -> impl Future<Output = Result<Started, Self::Error>> + Send + '_;

  /// Transition the shift to closed iff it is currently open. Returns `None`
  /// if the shift does not exist.
  fn close_shift(
    &self,
    shift_id: ShiftId,
    ended_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Closing<Shift>>, Self::Error>> + Send + '_;

  /// Atomically increment the scan counter of an open shift.
  fn increment_scan_count(
    &self,
    shift_id: ShiftId,
  ) -> impl Future<Output = Result<Counted, Self::Error>> + Send + '_;

  fn get_shift(
    &self,
    shift_id: ShiftId,
  ) -> impl Future<Output = Result<Option<Shift>, Self::Error>> + Send + '_;

  /// The supervisor's open shift, if any.
  fn find_open_shift<'a>(
    &'a self,
    supervisor: &'a SupervisorId,
  ) -> impl Future<Output = Result<Option<Shift>, Self::Error>> + Send + 'a;

  /// All shifts of a supervisor, newest first.
  fn list_shifts<'a>(
    &'a self,
    supervisor: &'a SupervisorId,
  ) -> impl Future<Output = Result<Vec<Shift>, Self::Error>> + Send + 'a;
}

/// Persistence for attendance records.
pub trait AttendanceStore: Store {
  /// In one transaction: verify the record's shift is open, insert the record
  /// unless its `(student, date, slot)` key is taken, and increment the
  /// shift's scan counter. On conflict nothing is written.
  fn insert_record(
    &self,
    record: AttendanceRecord,
  ) -> impl Future<Output = Result<InsertOutcome, Self::Error>> + Send + '_;

  /// Every record under the key. More than one means the uniqueness constraint
  /// has been lost.
  fn find_records(
    &self,
    student: StudentKey,
    date: NaiveDate,
    slot: Slot,
  ) -> impl Future<Output = Result<Vec<AttendanceRecord>, Self::Error>> + Send + '_;

  /// Records whose service day lies in `from..=to`, ordered by check-in time.
  fn records_between(
    &self,
    from: NaiveDate,
    to: NaiveDate,
  ) -> impl Future<Output = Result<Vec<AttendanceRecord>, Self::Error>> + Send + '_;

  /// Records admitted under a shift, ordered by check-in time.
  fn records_for_shift(
    &self,
    shift_id: ShiftId,
  ) -> impl Future<Output = Result<Vec<AttendanceRecord>, Self::Error>> + Send + '_;
}

/// Read-only view of the student directory.
pub trait StudentDirectory: Store {
  fn lookup(
    &self,
    student: StudentKey,
  ) -> impl Future<Output = Result<Option<StudentProfile>, Self::Error>> + Send + '_;
}
