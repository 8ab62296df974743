//! Identity token codec for Rollcall.
//!
//! Converts between the payload a student's QR code carries and the canonical
//! [`StudentKey`]. Pure apart from the read-only directory lookup in
//! [`TokenCodec::decode`]; no HTTP or database dependencies.
//!
//! # Quick start
//!
//! ```no_run
//! use chrono::Utc;
//! use rollcall_core::id::StudentKey;
//! use rollcall_token::{DescriptiveFields, TokenCodec};
//!
//! let codec = TokenCodec::new("a-long-random-server-secret").unwrap();
//! let fields = DescriptiveFields {
//!   full_name:  "Salma Adel".into(),
//!   email:      None,
//!   university: Some("Assiut".into()),
//! };
//! let payload = codec.encode(StudentKey::new(), &fields, Utc::now()).unwrap();
//! let claims = codec.verify(&payload).unwrap();
//! println!("sub={}", claims.sub);
//! ```

mod decode;
mod encode;
pub mod error;

use chrono::{DateTime, Utc};
use hmac::Hmac;
use rollcall_core::{
  id::StudentKey,
  store::StudentDirectory,
  student::StudentProfile,
};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

pub use error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Format tag carried as the first payload segment.
pub const VERSION: &str = "RC1";

/// Shortest secret the codec accepts.
pub const MIN_SECRET_LEN: usize = 16;

// ─── Public types ────────────────────────────────────────────────────────────

/// Human-readable fields printed into the token for auditability. Never used
/// for identity comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptiveFields {
  #[serde(rename = "name")]
  pub full_name:  String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub email:      Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub university: Option<String>,
}

impl From<&StudentProfile> for DescriptiveFields {
  fn from(profile: &StudentProfile) -> Self {
    Self {
      full_name:  profile.full_name.clone(),
      email:      profile.email.clone(),
      university: profile.university.clone(),
    }
  }
}

/// The signed content of a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
  /// The student this token identifies.
  pub sub:    StudentKey,
  /// When the token was issued. Audit only.
  pub iat:    DateTime<Utc>,
  #[serde(flatten)]
  pub fields: DescriptiveFields,
}

/// A verified token resolved against the student directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedToken {
  pub student_key: StudentKey,
  /// The directory's current profile; authoritative over `claims.fields`.
  pub profile:     StudentProfile,
  pub claims:      Claims,
}

// ─── Codec ───────────────────────────────────────────────────────────────────

/// Signs new tokens with the current secret and accepts tokens signed with
/// the current or any previous secret, so rotating the secret does not strand
/// printed codes.
#[derive(Clone)]
pub struct TokenCodec {
  /// `secrets[0]` signs; every entry verifies.
  secrets: Vec<Vec<u8>>,
}

impl std::fmt::Debug for TokenCodec {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("TokenCodec")
      .field("secrets", &self.secrets.len())
      .finish()
  }
}

impl TokenCodec {
  pub fn new(secret: impl AsRef<[u8]>) -> Result<Self> {
    Ok(Self { secrets: vec![checked_secret(secret.as_ref())?] })
  }

  /// Also accept tokens signed with `secret`.
  pub fn with_previous(mut self, secret: impl AsRef<[u8]>) -> Result<Self> {
    self.secrets.push(checked_secret(secret.as_ref())?);
    Ok(self)
  }

  /// Produce the payload for `student`. Identical inputs give identical
  /// payloads; only `issued_at` varies between reissues.
  pub fn encode(
    &self,
    student: StudentKey,
    fields: &DescriptiveFields,
    issued_at: DateTime<Utc>,
  ) -> Result<String> {
    let claims = Claims { sub: student, iat: issued_at, fields: fields.clone() };
    encode::encode(&self.secrets[0], &claims)
  }

  /// Check structure and signature and return the claims, without consulting
  /// the directory.
  pub fn verify(&self, raw: &str) -> Result<Claims> {
    decode::decode(&self.secrets, raw)
  }

  /// Verify `raw` and resolve its subject in `directory`.
  ///
  /// Fails with a malformed-token error for anything that does not verify and
  /// with [`Error::UnknownSubject`] for subjects the directory does not know.
  pub async fn decode<D>(&self, raw: &str, directory: &D) -> Result<DecodedToken>
  where
    D: StudentDirectory,
  {
    let claims = self.verify(raw)?;
    let profile = directory
      .lookup(claims.sub)
      .await
      .map_err(|e| Error::Directory(rollcall_core::Error::from_store(e)))?
      .ok_or(Error::UnknownSubject(claims.sub))?;

    Ok(DecodedToken { student_key: claims.sub, profile, claims })
  }
}

fn checked_secret(secret: &[u8]) -> Result<Vec<u8>> {
  if secret.len() < MIN_SECRET_LEN {
    return Err(Error::WeakSecret { min: MIN_SECRET_LEN, got: secret.len() });
  }
  Ok(secret.to_vec())
}
