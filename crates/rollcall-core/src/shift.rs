//! Shift types for one supervisor's bounded work session.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{
  attendance::Slot,
  id::{ShiftId, SupervisorId},
};

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ShiftStatus {
  Open,
  Closed,
}

/// A supervisor work session. Once `status` is `Closed` nothing about the
/// shift changes again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shift {
  pub shift_id:      ShiftId,
  pub supervisor_id: SupervisorId,
  pub status:        ShiftStatus,
  pub started_at:    DateTime<Utc>,
  pub ended_at:      Option<DateTime<Utc>>,
  /// Number of admissions recorded under this shift.
  pub scan_count:    u64,
}

impl Shift {
  /// A fresh open shift with no scans.
  pub fn open(supervisor_id: SupervisorId, started_at: DateTime<Utc>) -> Self {
    Self {
      shift_id: ShiftId::new(),
      supervisor_id,
      status: ShiftStatus::Open,
      started_at,
      ended_at: None,
      scan_count: 0,
    }
  }

  pub fn is_open(&self) -> bool { self.status == ShiftStatus::Open }

  /// Wall-clock length of a closed shift.
  pub fn duration(&self) -> Option<Duration> {
    self.ended_at.map(|end| end - self.started_at)
  }
}

/// The frozen aggregate reported when a shift closes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftSummary {
  pub shift:      Shift,
  /// Admissions recorded under the shift, broken down by slot.
  pub admissions: BTreeMap<Slot, u64>,
}

// ─── Transition outcomes ─────────────────────────────────────────────────────

/// Result of starting a shift.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Started {
  Opened(Shift),
  /// The supervisor already had an open shift; it is returned so the device
  /// can resume it.
  AlreadyOpen(Shift),
}

impl Started {
  pub fn shift(&self) -> &Shift {
    match self {
      Self::Opened(s) | Self::AlreadyOpen(s) => s,
    }
  }

  pub fn into_shift(self) -> Shift {
    match self {
      Self::Opened(s) | Self::AlreadyOpen(s) => s,
    }
  }

  pub fn is_resumed(&self) -> bool { matches!(self, Self::AlreadyOpen(_)) }
}

/// Result of closing a shift. Both arms carry the same final state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Closing<T> {
  Closed(T),
  AlreadyClosed(T),
}

impl<T> Closing<T> {
  pub fn get(&self) -> &T {
    match self {
      Self::Closed(t) | Self::AlreadyClosed(t) => t,
    }
  }

  pub fn into_inner(self) -> T {
    match self {
      Self::Closed(t) | Self::AlreadyClosed(t) => t,
    }
  }

  pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Closing<U> {
    match self {
      Self::Closed(t) => Closing::Closed(f(t)),
      Self::AlreadyClosed(t) => Closing::AlreadyClosed(f(t)),
    }
  }
}
