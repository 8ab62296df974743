//! Student directory read model.
//!
//! The directory is owned by the registration system; the core only reads it
//! to attach descriptive fields to a scan and to reject unknown identities.

use serde::{Deserialize, Serialize};

use crate::id::StudentKey;

/// Descriptive fields carried alongside a [`StudentKey`]. Never consulted for
/// identity comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProfile {
  pub student_key: StudentKey,
  pub full_name:   String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub email:       Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub university:  Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub phone:       Option<String>,
}
