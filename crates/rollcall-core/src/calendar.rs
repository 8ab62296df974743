//! The canonical service calendar.
//!
//! Attendance is keyed by calendar day, never by time of day. Every instant is
//! converted to a day in one fixed time zone before it reaches the ledger.

use chrono::{DateTime, FixedOffset, NaiveDate, Offset as _, Utc};

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceCalendar {
  offset: FixedOffset,
}

impl ServiceCalendar {
  pub fn new(offset: FixedOffset) -> Self { Self { offset } }

  pub fn utc() -> Self { Self::new(Utc.fix()) }

  /// Parse an offset such as `+02:00`, `-05:30`, or `Z`.
  pub fn parse(offset: &str) -> Result<Self> {
    let trimmed = offset.trim();
    if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
      return Ok(Self::utc());
    }
    trimmed
      .parse::<FixedOffset>()
      .map(Self::new)
      .map_err(|_| Error::InvalidUtcOffset(offset.to_owned()))
  }

  pub fn offset(&self) -> FixedOffset { self.offset }

  /// The service day `instant` falls on.
  pub fn day_of(&self, instant: DateTime<Utc>) -> NaiveDate {
    instant.with_timezone(&self.offset).date_naive()
  }
}

impl Default for ServiceCalendar {
  fn default() -> Self { Self::utc() }
}
