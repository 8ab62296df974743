//! Token serializer.
//!
//! Output: `RC1.<claims>.<mac>` where `<claims>` is the unpadded base64url
//! encoding of the claims JSON and `<mac>` is the unpadded base64url
//! HMAC-SHA256 of `RC1.<claims>` under the current secret. Only characters
//! from the base64url alphabet and `.` appear, so the payload fits a QR code
//! in byte mode without escaping.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD as B64};
use hmac::Mac as _;

use crate::{
  Claims, HmacSha256, MIN_SECRET_LEN, VERSION,
  error::{Error, Result},
};

pub(crate) fn encode(secret: &[u8], claims: &Claims) -> Result<String> {
  let body = B64.encode(serde_json::to_vec(claims)?);
  let signed = format!("{VERSION}.{body}");
  let mac = B64.encode(sign(secret, signed.as_bytes())?);
  Ok(format!("{signed}.{mac}"))
}

pub(crate) fn sign(secret: &[u8], message: &[u8]) -> Result<Vec<u8>> {
  let mut mac = keyed(secret)?;
  mac.update(message);
  Ok(mac.finalize().into_bytes().to_vec())
}

pub(crate) fn keyed(secret: &[u8]) -> Result<HmacSha256> {
  HmacSha256::new_from_slice(secret).map_err(|_| Error::WeakSecret {
    min: MIN_SECRET_LEN,
    got: secret.len(),
  })
}
