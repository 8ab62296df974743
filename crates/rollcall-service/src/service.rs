//! [`CheckInService`] orchestrates one scan from raw QR payload to outcome.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rollcall_core::{
  Error, ErrorKind, Result,
  attendance::{AttendanceRecord, EventSink, Slot},
  calendar::ServiceCalendar,
  id::{ShiftId, StudentKey, SupervisorId},
  ledger::{Admission, AttendanceLedger},
  lifecycle::ShiftManager,
  shift::{Closing, Shift, ShiftSummary, Started},
  store::{AttendanceStore, ShiftStore, StudentDirectory},
  student::StudentProfile,
};
use rollcall_token::{DecodedToken, DescriptiveFields, TokenCodec};
use serde::Serialize;
use tracing::{error, info, warn};

/// Everything a check-in backend has to provide.
pub trait Backend:
  ShiftStore + AttendanceStore + StudentDirectory + 'static
{
}

impl<S> Backend for S where
  S: ShiftStore + AttendanceStore + StudentDirectory + 'static
{
}

// ─── Outcomes ────────────────────────────────────────────────────────────────

/// What the scanning device shows after a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScanOutcome {
  /// First admission of this student for the slot.
  CheckedIn {
    record:  AttendanceRecord,
    student: StudentProfile,
  },
  /// The caller's own earlier admission, e.g. a retry after a timeout.
  AlreadyCheckedIn {
    record:  AttendanceRecord,
    student: StudentProfile,
  },
  /// Another shift admitted the student first.
  Duplicate {
    existing: AttendanceRecord,
    student:  StudentProfile,
  },
  /// The supervisor must start a shift first.
  NoOpenShift,
  /// The shift closed before the scan committed.
  ShiftClosed { shift_id: ShiftId },
}

impl ScanOutcome {
  /// `true` when the student is admitted for the slot by this caller.
  pub fn is_success(&self) -> bool {
    matches!(self, Self::CheckedIn { .. } | Self::AlreadyCheckedIn { .. })
  }
}

/// A freshly encoded QR payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedToken {
  pub student_key: StudentKey,
  pub issued_at:   DateTime<Utc>,
  pub payload:     String,
}

// ─── Service ─────────────────────────────────────────────────────────────────

pub struct CheckInService<S> {
  codec:     TokenCodec,
  ledger:    AttendanceLedger<S>,
  shifts:    ShiftManager<S>,
  directory: Arc<S>,
}

impl<S: Backend> CheckInService<S> {
  /// Build a service whose ledger, shift manager and directory all share
  /// `store`.
  pub fn new(store: Arc<S>, codec: TokenCodec, calendar: ServiceCalendar) -> Self {
    Self {
      codec,
      ledger: AttendanceLedger::new(Arc::clone(&store), calendar),
      shifts: ShiftManager::new(Arc::clone(&store)),
      directory: store,
    }
  }

  pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
    self.ledger = self.ledger.with_events(events);
    self
  }

  pub fn ledger(&self) -> &AttendanceLedger<S> { &self.ledger }

  pub fn shifts(&self) -> &ShiftManager<S> { &self.shifts }

  pub fn calendar(&self) -> ServiceCalendar { self.ledger.calendar() }

  // ── Scanning ──────────────────────────────────────────────────────────────

  /// Admit the student behind `raw_token` for `slot` under the supervisor's
  /// open shift.
  ///
  /// Duplicates, missing shifts and closed shifts are outcomes, not errors.
  /// Errors are reserved for bad input and store failures.
  pub async fn scan(
    &self,
    supervisor: &SupervisorId,
    raw_token: &str,
    slot: &str,
    now: DateTime<Utc>,
  ) -> Result<ScanOutcome> {
    let slot = Slot::parse(slot)?;
    let decoded = self.decode(raw_token).await?;

    let shift = match self.shifts.resolve_open_shift(supervisor).await {
      Ok(shift) => shift,
      Err(Error::NoOpenShift(_)) => {
        info!(supervisor = %supervisor, "scan without an open shift");
        return Ok(ScanOutcome::NoOpenShift);
      }
      Err(e) => return Err(logged(e)),
    };

    self.admit(&shift, supervisor, decoded, slot, now).await
  }

  /// Like [`scan`](Self::scan), but the device names the shift it believes
  /// is open. The shift must belong to `supervisor`.
  pub async fn scan_in_shift(
    &self,
    supervisor: &SupervisorId,
    shift_id: ShiftId,
    raw_token: &str,
    slot: &str,
    now: DateTime<Utc>,
  ) -> Result<ScanOutcome> {
    let slot = Slot::parse(slot)?;
    let decoded = self.decode(raw_token).await?;

    let shift = self.shifts.owned_by(supervisor, shift_id).await.map_err(logged)?;
    if !shift.is_open() {
      info!(shift = %shift_id, supervisor = %supervisor, "scan into closed shift");
      return Ok(ScanOutcome::ShiftClosed { shift_id });
    }

    self.admit(&shift, supervisor, decoded, slot, now).await
  }

  async fn decode(&self, raw_token: &str) -> Result<DecodedToken> {
    self
      .codec
      .decode(raw_token, &*self.directory)
      .await
      .map_err(|e| logged(e.into()))
  }

  async fn admit(
    &self,
    shift: &Shift,
    supervisor: &SupervisorId,
    decoded: DecodedToken,
    slot: Slot,
    now: DateTime<Utc>,
  ) -> Result<ScanOutcome> {
    let date = self.calendar().day_of(now);
    let admission = self
      .ledger
      .admit(decoded.student_key, date, slot, shift.shift_id, supervisor, now)
      .await;

    let student = decoded.profile;
    match admission {
      Ok(Admission::Admitted(record)) => Ok(ScanOutcome::CheckedIn { record, student }),
      Ok(Admission::Rejected(record)) if record.is_owned_by(shift.shift_id, supervisor) => {
        info!(
          student = %record.student_key,
          shift = %shift.shift_id,
          %slot,
          "repeat scan of own admission"
        );
        Ok(ScanOutcome::AlreadyCheckedIn { record, student })
      }
      Ok(Admission::Rejected(existing)) => {
        Ok(ScanOutcome::Duplicate { existing, student })
      }
      Err(Error::ShiftClosed(shift_id)) => {
        info!(shift = %shift_id, supervisor = %supervisor, "shift closed during scan");
        Ok(ScanOutcome::ShiftClosed { shift_id })
      }
      Err(e) => Err(logged(e)),
    }
  }

  // ── Tokens ────────────────────────────────────────────────────────────────

  /// Encode a fresh token for a student known to the directory.
  pub async fn issue_token(
    &self,
    student: StudentKey,
    now: DateTime<Utc>,
  ) -> Result<IssuedToken> {
    let profile = self
      .directory
      .lookup(student)
      .await
      .map_err(|e| logged(Error::from_store(e)))?
      .ok_or(Error::UnknownSubject(student))?;

    let payload = self
      .codec
      .encode(student, &DescriptiveFields::from(&profile), now)
      .map_err(Error::from)?;
    info!(student = %student, "token issued");
    Ok(IssuedToken { student_key: student, issued_at: now, payload })
  }

  // ── Shifts ────────────────────────────────────────────────────────────────

  pub async fn start_shift(
    &self,
    supervisor: &SupervisorId,
    now: DateTime<Utc>,
  ) -> Result<Started> {
    self.shifts.start(supervisor, now).await.map_err(logged)
  }

  /// Close one of the supervisor's own shifts.
  pub async fn close_shift(
    &self,
    supervisor: &SupervisorId,
    shift_id: ShiftId,
    now: DateTime<Utc>,
  ) -> Result<Closing<ShiftSummary>> {
    self.shifts.owned_by(supervisor, shift_id).await?;
    self.shifts.close(shift_id, now).await.map_err(logged)
  }

  /// Records admitted under one of the supervisor's own shifts.
  pub async fn shift_records(
    &self,
    supervisor: &SupervisorId,
    shift_id: ShiftId,
  ) -> Result<Vec<AttendanceRecord>> {
    self.shifts.owned_by(supervisor, shift_id).await?;
    self.ledger.records_for_shift(shift_id).await.map_err(logged)
  }

  pub async fn shift_summary(
    &self,
    supervisor: &SupervisorId,
    shift_id: ShiftId,
  ) -> Result<ShiftSummary> {
    self.shifts.owned_by(supervisor, shift_id).await?;
    self.shifts.summary(shift_id).await.map_err(logged)
  }
}

/// Log infrastructure failures at the severity their kind deserves.
fn logged(err: Error) -> Error {
  match err.kind() {
    ErrorKind::Client => {}
    ErrorKind::Transient => warn!(error = %err, "store unavailable"),
    ErrorKind::Integrity => error!(error = %err, "integrity violation"),
  }
  err
}
