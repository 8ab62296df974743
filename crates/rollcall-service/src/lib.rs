//! Check-in orchestration and JSON API for Rollcall.
//!
//! [`CheckInService`] ties the token codec, the attendance ledger and the
//! shift manager together; [`api_router`] exposes it over HTTP. Supervisor
//! authentication is upstream: requests carry the already-authenticated id in
//! the `x-supervisor-id` header.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", rollcall_service::api_router(service.clone()))
//! ```

pub mod attendance;
pub mod error;
pub mod events;
pub mod extract;
pub mod scans;
pub mod service;
pub mod shifts;
pub mod students;
pub mod supervisor;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};

pub use error::ApiError;
pub use events::BroadcastEvents;
pub use service::{Backend, CheckInService, IssuedToken, ScanOutcome};

/// Build a fully-materialised API router for `service`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S: Backend>(service: Arc<CheckInService<S>>) -> Router<()> {
  Router::new()
    // Shifts
    .route("/shifts", post(shifts::start::<S>))
    .route("/shifts/open", get(shifts::open::<S>))
    .route("/shifts/history", get(shifts::history::<S>))
    .route("/shifts/{id}", get(shifts::summary::<S>))
    .route("/shifts/{id}/close", post(shifts::close::<S>))
    .route("/shifts/{id}/records", get(shifts::records::<S>))
    // Scanning
    .route("/scans", post(scans::scan::<S>))
    // Reads and tokens
    .route("/attendance", get(attendance::list::<S>))
    .route("/students/{key}/token", post(students::issue_token::<S>))
    .with_state(service)
}

#[cfg(test)]
mod tests;
