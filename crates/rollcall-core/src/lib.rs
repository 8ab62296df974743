//! Core types and trait definitions for the Rollcall check-in service.
//!
//! This crate owns the two invariants the rest of the workspace leans on:
//! at most one attendance record per `(student, service day, slot)`, and at
//! most one open shift per supervisor. It is free of HTTP and database
//! dependencies; storage backends implement the traits in [`store`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod attendance;
pub mod calendar;
pub mod error;
pub mod id;
pub mod ledger;
pub mod lifecycle;
pub mod shift;
pub mod store;
pub mod student;

pub use error::{Error, ErrorKind, Result};
