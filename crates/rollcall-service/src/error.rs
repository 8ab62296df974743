//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use rollcall_core::Error as CoreError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Core(#[from] CoreError),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("missing x-supervisor-id header")]
  MissingSupervisor,
}

impl ApiError {
  /// Status code and stable machine-readable code for the body.
  fn classify(&self) -> (StatusCode, &'static str) {
    let core = match self {
      Self::BadRequest(_) => return (StatusCode::BAD_REQUEST, "bad_request"),
      Self::MissingSupervisor => {
        return (StatusCode::BAD_REQUEST, "missing_supervisor");
      }
      Self::Core(e) => e,
    };
    match core {
      CoreError::MalformedToken(_) => (StatusCode::BAD_REQUEST, "malformed_token"),
      CoreError::UnknownSubject(_) => (StatusCode::NOT_FOUND, "unknown_subject"),
      CoreError::InvalidSlot(_) => (StatusCode::BAD_REQUEST, "invalid_slot"),
      CoreError::InvalidDate { .. } => (StatusCode::BAD_REQUEST, "invalid_date"),
      CoreError::InvalidRange { .. } => (StatusCode::BAD_REQUEST, "invalid_range"),
      CoreError::InvalidSupervisor(_) => {
        (StatusCode::BAD_REQUEST, "invalid_supervisor")
      }
      CoreError::InvalidUtcOffset(_) => {
        (StatusCode::BAD_REQUEST, "invalid_utc_offset")
      }
      CoreError::NoOpenShift(_) => (StatusCode::CONFLICT, "no_open_shift"),
      CoreError::ShiftClosed(_) => (StatusCode::CONFLICT, "shift_closed"),
      CoreError::ShiftNotFound(_) => (StatusCode::NOT_FOUND, "shift_not_found"),
      CoreError::ShiftNotOwned { .. } => (StatusCode::FORBIDDEN, "shift_not_owned"),
      CoreError::StoreUnavailable(_) => {
        (StatusCode::SERVICE_UNAVAILABLE, "store_unavailable")
      }
      CoreError::Integrity(_) => (StatusCode::INTERNAL_SERVER_ERROR, "integrity"),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, code) = self.classify();
    let body = Json(json!({ "error": code, "message": self.to_string() }));
    let mut response = (status, body).into_response();
    if status == StatusCode::SERVICE_UNAVAILABLE {
      response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from_static("1"));
    }
    response
  }
}
