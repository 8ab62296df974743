//! SQLite backend for the Rollcall stores.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. The at-most-once guarantees live in the
//! schema's unique indexes; [`SqliteStore::open`] refuses a database that is
//! missing them.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
