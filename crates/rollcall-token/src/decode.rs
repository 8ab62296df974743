//! Token parser.
//!
//! Pipeline:
//!   raw &str
//!     └─ split_segments()  → (version, claims, mac)
//!          └─ verify_mac()  → authenticated claims bytes
//!               └─ serde_json → Claims
//!
//! The signature is checked before the claims JSON is parsed, so nothing an
//! attacker controls reaches the JSON parser unless it was signed by us.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD as B64};
use hmac::Mac as _;

use crate::{
  Claims, VERSION,
  encode::keyed,
  error::{Error, Result},
};

/// Generous upper bound; real payloads are a few hundred bytes.
const MAX_PAYLOAD_LEN: usize = 2048;

struct Segments<'a> {
  version: &'a str,
  claims:  &'a str,
  mac:     &'a str,
}

impl Segments<'_> {
  /// The exact bytes covered by the MAC.
  fn signed_part(&self) -> String { format!("{}.{}", self.version, self.claims) }
}

fn split_segments(raw: &str) -> Result<Segments<'_>> {
  if raw.is_empty() {
    return Err(Error::Malformed("empty payload".into()));
  }
  if raw.len() > MAX_PAYLOAD_LEN {
    return Err(Error::Malformed(format!(
      "payload is {} bytes, limit is {MAX_PAYLOAD_LEN}",
      raw.len()
    )));
  }

  let mut parts = raw.split('.');
  match (parts.next(), parts.next(), parts.next(), parts.next()) {
    (Some(version), Some(claims), Some(mac), None)
      if !claims.is_empty() && !mac.is_empty() =>
    {
      Ok(Segments { version, claims, mac })
    }
    _ => Err(Error::Malformed(
      "expected three non-empty dot-separated segments".into(),
    )),
  }
}

/// Verify `raw` against each secret in turn and return its claims.
pub(crate) fn decode(secrets: &[Vec<u8>], raw: &str) -> Result<Claims> {
  let segments = split_segments(raw.trim())?;
  if segments.version != VERSION {
    return Err(Error::UnsupportedVersion(segments.version.to_owned()));
  }

  let tag = B64
    .decode(segments.mac)
    .map_err(|_| Error::Malformed("signature is not base64url".into()))?;

  let signed = segments.signed_part();
  let mut verified = false;
  for secret in secrets {
    let mut mac = keyed(secret)?;
    mac.update(signed.as_bytes());
    if mac.verify_slice(&tag).is_ok() {
      verified = true;
      break;
    }
  }
  if !verified {
    return Err(Error::BadSignature);
  }

  let body = B64
    .decode(segments.claims)
    .map_err(|_| Error::Malformed("claims are not base64url".into()))?;
  serde_json::from_slice(&body)
    .map_err(|e| Error::Malformed(format!("claims: {e}")))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rejects_wrong_segment_count() {
    assert!(matches!(split_segments("RC1.abc"), Err(Error::Malformed(_))));
    assert!(matches!(
      split_segments("RC1.a.b.c"),
      Err(Error::Malformed(_))
    ));
    assert!(matches!(split_segments("RC1..mac"), Err(Error::Malformed(_))));
  }

  #[test]
  fn rejects_oversized_payload() {
    let huge = format!("RC1.{}.mac", "a".repeat(MAX_PAYLOAD_LEN));
    assert!(matches!(split_segments(&huge), Err(Error::Malformed(_))));
  }

  #[test]
  fn splits_well_formed_payload() {
    let s = split_segments("RC1.claims.mac").unwrap();
    assert_eq!(s.version, "RC1");
    assert_eq!(s.signed_part(), "RC1.claims");
    assert_eq!(s.mac, "mac");
  }
}
