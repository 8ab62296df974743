//! Handler for `POST /scans`.
//!
//! Body: `{"token": "RC1....", "slot": "first", "shift_id": "…"?}`. Without
//! `shift_id` the supervisor's open shift is used.
//!
//! The body is always a [`ScanOutcome`]; the status tells a device whether
//! to show green (201 checked in, 200 own repeat) or red (409).

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use rollcall_core::id::ShiftId;
use serde::Deserialize;

use crate::{
  error::ApiError,
  extract::JsonBody,
  service::{Backend, CheckInService, ScanOutcome},
  supervisor::Supervisor,
};

#[derive(Debug, Deserialize)]
pub struct ScanBody {
  pub token:    String,
  pub slot:     String,
  #[serde(default)]
  pub shift_id: Option<ShiftId>,
}

/// `POST /scans`
pub async fn scan<S: Backend>(
  State(service): State<Arc<CheckInService<S>>>,
  Supervisor(supervisor): Supervisor,
  JsonBody(body): JsonBody<ScanBody>,
) -> Result<impl IntoResponse, ApiError> {
  let now = Utc::now();
  let outcome = match body.shift_id {
    Some(shift_id) => {
      service
        .scan_in_shift(&supervisor, shift_id, &body.token, &body.slot, now)
        .await?
    }
    None => service.scan(&supervisor, &body.token, &body.slot, now).await?,
  };

  let status = match &outcome {
    ScanOutcome::CheckedIn { .. } => StatusCode::CREATED,
    ScanOutcome::AlreadyCheckedIn { .. } => StatusCode::OK,
    ScanOutcome::Duplicate { .. }
    | ScanOutcome::NoOpenShift
    | ScanOutcome::ShiftClosed { .. } => StatusCode::CONFLICT,
  };
  Ok((status, Json(outcome)))
}
