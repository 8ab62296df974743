//! Supervisor identity extractor.
//!
//! Authentication happens upstream; the authenticating proxy forwards the
//! supervisor's id in [`SUPERVISOR_HEADER`] and this layer trusts it.

use axum::{extract::FromRequestParts, http::request::Parts};
use rollcall_core::id::SupervisorId;

use crate::error::ApiError;

pub const SUPERVISOR_HEADER: &str = "x-supervisor-id";

/// Present in a handler means the request named a well-formed supervisor.
pub struct Supervisor(pub SupervisorId);

impl<S> FromRequestParts<S> for Supervisor
where
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &S,
  ) -> Result<Self, Self::Rejection> {
    let raw = parts
      .headers
      .get(SUPERVISOR_HEADER)
      .ok_or(ApiError::MissingSupervisor)?
      .to_str()
      .map_err(|_| ApiError::BadRequest(format!("{SUPERVISOR_HEADER} is not ASCII")))?;
    Ok(Self(SupervisorId::new(raw)?))
  }
}
