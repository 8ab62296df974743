//! [`ShiftManager`]: supervisor shift lifecycle.
//!
//! ```text
//!   start ──► open ──(record_scan)*──► close ──► closed
//! ```
//!
//! `closed` is terminal. Every transition is a conditional write in the
//! store, so a racing double start or double close resolves to exactly one
//! winner and the rest observe it.

use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, Utc};
use strum::IntoEnumIterator as _;
use tracing::info;

use crate::{
  Error, Result,
  attendance::Slot,
  id::{ShiftId, SupervisorId},
  shift::{Closing, Shift, ShiftSummary, Started},
  store::{AttendanceStore, Counted, ShiftStore},
};

pub struct ShiftManager<S> {
  store: Arc<S>,
}

impl<S> Clone for ShiftManager<S> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store) } }
}

impl<S> ShiftManager<S>
where
  S: ShiftStore + AttendanceStore,
{
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  /// Open a shift for `supervisor`.
  ///
  /// If one is already open it is returned as [`Started::AlreadyOpen`] so a
  /// device that crashed or reconnected can resume it.
  pub async fn start(
    &self,
    supervisor: &SupervisorId,
    now: DateTime<Utc>,
  ) -> Result<Started> {
    let started = self
      .store
      .open_shift(Shift::open(supervisor.clone(), now))
      .await
      .map_err(Error::from_store)?;

    match &started {
      Started::Opened(shift) => {
        info!(shift = %shift.shift_id, supervisor = %supervisor, "shift opened");
      }
      Started::AlreadyOpen(shift) => {
        info!(
          shift = %shift.shift_id,
          supervisor = %supervisor,
          "shift already open, resuming"
        );
      }
    }
    Ok(started)
  }

  /// The supervisor's open shift, or [`Error::NoOpenShift`].
  pub async fn resolve_open_shift(&self, supervisor: &SupervisorId) -> Result<Shift> {
    self
      .store
      .find_open_shift(supervisor)
      .await
      .map_err(Error::from_store)?
      .ok_or_else(|| Error::NoOpenShift(supervisor.clone()))
  }

  pub async fn get(&self, shift_id: ShiftId) -> Result<Shift> {
    self
      .store
      .get_shift(shift_id)
      .await
      .map_err(Error::from_store)?
      .ok_or(Error::ShiftNotFound(shift_id))
  }

  /// Fetch a shift and check it belongs to `supervisor`.
  pub async fn owned_by(
    &self,
    supervisor: &SupervisorId,
    shift_id: ShiftId,
  ) -> Result<Shift> {
    let shift = self.get(shift_id).await?;
    if &shift.supervisor_id != supervisor {
      return Err(Error::ShiftNotOwned {
        shift:      shift_id,
        supervisor: supervisor.clone(),
      });
    }
    Ok(shift)
  }

  /// Every shift the supervisor has worked, newest first.
  pub async fn history(&self, supervisor: &SupervisorId) -> Result<Vec<Shift>> {
    self
      .store
      .list_shifts(supervisor)
      .await
      .map_err(Error::from_store)
  }

  /// Count one scan against an open shift. Returns the new count.
  ///
  /// Admissions are counted inside the ledger's write; this is the same
  /// atomic increment exposed on its own.
  pub async fn record_scan(&self, shift_id: ShiftId) -> Result<u64> {
    match self
      .store
      .increment_scan_count(shift_id)
      .await
      .map_err(Error::from_store)?
    {
      Counted::Recorded(count) => Ok(count),
      Counted::ShiftClosed => Err(Error::ShiftClosed(shift_id)),
      Counted::ShiftMissing => Err(Error::ShiftNotFound(shift_id)),
    }
  }

  /// Close an open shift and freeze its counters.
  ///
  /// Idempotent: closing an already-closed shift returns
  /// [`Closing::AlreadyClosed`] with the same summary and changes nothing.
  pub async fn close(
    &self,
    shift_id: ShiftId,
    now: DateTime<Utc>,
  ) -> Result<Closing<ShiftSummary>> {
    let closing = self
      .store
      .close_shift(shift_id, now)
      .await
      .map_err(Error::from_store)?
      .ok_or(Error::ShiftNotFound(shift_id))?;

    if let Closing::Closed(shift) = &closing {
      info!(
        shift = %shift.shift_id,
        supervisor = %shift.supervisor_id,
        scans = shift.scan_count,
        minutes = shift.duration().map_or(0, |d| d.num_minutes()),
        "shift closed"
      );
    }

    let admissions = self.admissions_by_slot(shift_id).await?;
    Ok(closing.map(|shift| ShiftSummary { shift, admissions }))
  }

  /// Current aggregate of a shift, open or closed.
  pub async fn summary(&self, shift_id: ShiftId) -> Result<ShiftSummary> {
    let shift = self.get(shift_id).await?;
    let admissions = self.admissions_by_slot(shift_id).await?;
    Ok(ShiftSummary { shift, admissions })
  }

  async fn admissions_by_slot(&self, shift_id: ShiftId) -> Result<BTreeMap<Slot, u64>> {
    let records = self
      .store
      .records_for_shift(shift_id)
      .await
      .map_err(Error::from_store)?;

    let mut counts: BTreeMap<Slot, u64> = Slot::iter().map(|s| (s, 0)).collect();
    for record in &records {
      *counts.entry(record.slot).or_default() += 1;
    }
    Ok(counts)
  }
}
