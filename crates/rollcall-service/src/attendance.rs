//! Handler for `GET /attendance`.
//!
//! Query parameters (all optional):
//!
//! - `date=YYYY-MM-DD`, or `from=…&to=…` for an inclusive range; defaults to
//!   the current service day
//! - `student=<uuid>` and `slot=first|second` to narrow the result

use std::sync::Arc;

use axum::{Json, extract::State};
use chrono::{NaiveDate, Utc};
use rollcall_core::{
  attendance::{AttendanceRecord, Slot},
  id::StudentKey,
};
use serde::Deserialize;

use crate::{
  error::ApiError,
  extract::QueryParams,
  service::{Backend, CheckInService},
  supervisor::Supervisor,
};

#[derive(Debug, Default, Deserialize)]
pub struct AttendanceParams {
  pub date:    Option<NaiveDate>,
  pub from:    Option<NaiveDate>,
  pub to:      Option<NaiveDate>,
  pub student: Option<StudentKey>,
  pub slot:    Option<String>,
}

/// `GET /attendance[?date=|from=&to=][&student=][&slot=]`
pub async fn list<S: Backend>(
  State(service): State<Arc<CheckInService<S>>>,
  Supervisor(_): Supervisor,
  QueryParams(params): QueryParams<AttendanceParams>,
) -> Result<Json<Vec<AttendanceRecord>>, ApiError> {
  let slot = params.slot.as_deref().map(Slot::parse).transpose()?;
  let (from, to) = match (params.date, params.from, params.to) {
    (Some(date), None, None) => (date, date),
    (None, Some(from), Some(to)) => (from, to),
    (None, None, None) => {
      let today = service.calendar().day_of(Utc::now());
      (today, today)
    }
    _ => {
      return Err(ApiError::BadRequest(
        "use either `date` or both `from` and `to`".into(),
      ));
    }
  };

  let ledger = service.ledger();
  if let (Some(student), Some(slot)) = (params.student, slot)
    && from == to
  {
    let found = ledger.lookup(student, from, slot).await?;
    return Ok(Json(found.into_iter().collect()));
  }

  let records = ledger
    .records_between(from, to)
    .await?
    .into_iter()
    .filter(|r| params.student.is_none_or(|s| r.student_key == s))
    .filter(|r| slot.is_none_or(|s| r.slot == s))
    .collect();
  Ok(Json(records))
}
