//! Handler for `POST /students/{key}/token`.
//!
//! Issues a fresh QR payload from the directory's current profile. Earlier
//! payloads for the same student stay valid. Only supervisors may request
//! one, so the caller is recorded alongside the issue.

use std::sync::Arc;

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use chrono::Utc;
use rollcall_core::id::StudentKey;
use tracing::info;

use crate::{
  error::ApiError,
  extract::PathParam,
  service::{Backend, CheckInService},
  supervisor::Supervisor,
};

/// `POST /students/{key}/token`
pub async fn issue_token<S: Backend>(
  State(service): State<Arc<CheckInService<S>>>,
  Supervisor(supervisor): Supervisor,
  PathParam(student): PathParam<StudentKey>,
) -> Result<impl IntoResponse, ApiError> {
  let issued = service.issue_token(student, Utc::now()).await?;
  info!(student = %student, supervisor = %supervisor, "token handed out");
  Ok((StatusCode::CREATED, Json(issued)))
}
