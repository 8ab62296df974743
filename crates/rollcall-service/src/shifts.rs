//! Handlers for `/shifts` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/shifts` | 201 new shift, 200 `"resumed": true` if one was open |
//! | `GET`  | `/shifts/open` | 409 `no_open_shift` if none |
//! | `GET`  | `/shifts/history` | Newest first |
//! | `GET`  | `/shifts/{id}` | Live summary |
//! | `POST` | `/shifts/{id}/close` | Idempotent |
//! | `GET`  | `/shifts/{id}/records` | Admissions under the shift |

use std::sync::Arc;

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use chrono::Utc;
use rollcall_core::{
  attendance::AttendanceRecord,
  id::ShiftId,
  shift::{Closing, Shift, ShiftSummary},
};
use serde::Serialize;

use crate::{
  error::ApiError,
  extract::PathParam,
  service::{Backend, CheckInService},
  supervisor::Supervisor,
};

#[derive(Debug, Serialize)]
pub struct ShiftBody {
  #[serde(flatten)]
  pub shift:   Shift,
  pub resumed: bool,
}

#[derive(Debug, Serialize)]
pub struct CloseBody {
  #[serde(flatten)]
  pub summary:        ShiftSummary,
  pub already_closed: bool,
}

// ─── Start ───────────────────────────────────────────────────────────────────

/// `POST /shifts`
pub async fn start<S: Backend>(
  State(service): State<Arc<CheckInService<S>>>,
  Supervisor(supervisor): Supervisor,
) -> Result<impl IntoResponse, ApiError> {
  let started = service.start_shift(&supervisor, Utc::now()).await?;
  let resumed = started.is_resumed();
  let status = if resumed { StatusCode::OK } else { StatusCode::CREATED };
  Ok((status, Json(ShiftBody { shift: started.into_shift(), resumed })))
}

// ─── Read ────────────────────────────────────────────────────────────────────

/// `GET /shifts/open`
pub async fn open<S: Backend>(
  State(service): State<Arc<CheckInService<S>>>,
  Supervisor(supervisor): Supervisor,
) -> Result<Json<Shift>, ApiError> {
  Ok(Json(service.shifts().resolve_open_shift(&supervisor).await?))
}

/// `GET /shifts/history`
pub async fn history<S: Backend>(
  State(service): State<Arc<CheckInService<S>>>,
  Supervisor(supervisor): Supervisor,
) -> Result<Json<Vec<Shift>>, ApiError> {
  Ok(Json(service.shifts().history(&supervisor).await?))
}

/// `GET /shifts/{id}`
pub async fn summary<S: Backend>(
  State(service): State<Arc<CheckInService<S>>>,
  Supervisor(supervisor): Supervisor,
  PathParam(id): PathParam<ShiftId>,
) -> Result<Json<ShiftSummary>, ApiError> {
  Ok(Json(service.shift_summary(&supervisor, id).await?))
}

/// `GET /shifts/{id}/records`
pub async fn records<S: Backend>(
  State(service): State<Arc<CheckInService<S>>>,
  Supervisor(supervisor): Supervisor,
  PathParam(id): PathParam<ShiftId>,
) -> Result<Json<Vec<AttendanceRecord>>, ApiError> {
  Ok(Json(service.shift_records(&supervisor, id).await?))
}

// ─── Close ───────────────────────────────────────────────────────────────────

/// `POST /shifts/{id}/close`
pub async fn close<S: Backend>(
  State(service): State<Arc<CheckInService<S>>>,
  Supervisor(supervisor): Supervisor,
  PathParam(id): PathParam<ShiftId>,
) -> Result<Json<CloseBody>, ApiError> {
  let closing = service.close_shift(&supervisor, id, Utc::now()).await?;
  let already_closed = matches!(closing, Closing::AlreadyClosed(_));
  Ok(Json(CloseBody { summary: closing.into_inner(), already_closed }))
}
