//! Tamper-evident cookie values.
//!
//! A signed value has the shape `<value>.<signature>` where the signature is
//! the base64url HMAC-SHA256 of `<value>` under the session secret.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::{SessionError, SessionValues};

type HmacSha256 = Hmac<Sha256>;

fn mac(secret: &str) -> HmacSha256 {
    // HMAC accepts keys of any length.
    HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size")
}

/// Sign a value with the given secret.
pub fn sign(value: &str, secret: &str) -> String {
    let mut mac = mac(secret);
    mac.update(value.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
    format!("{value}.{signature}")
}

/// Verify a signed value and return the original.
///
/// Returns `None` for anything that is unsigned, malformed or signed with a
/// different secret.
pub fn unsign(signed: &str, secret: &str) -> Option<String> {
    let (value, signature) = signed.rsplit_once('.')?;
    if signature.is_empty() {
        return None;
    }

    let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;
    let mut mac = mac(secret);
    mac.update(value.as_bytes());
    mac.verify_slice(&signature).ok()?;

    Some(value.to_string())
}

/// Encode session values as a cookie-safe string (percent-encoded JSON).
pub fn encode_payload(values: &SessionValues) -> Result<String, SessionError> {
    let json = serde_json::to_string(values).map_err(|e| SessionError::Serialize(e.to_string()))?;
    Ok(urlencoding::encode(&json).into_owned())
}

/// Decode a payload produced by [`encode_payload`].
pub fn decode_payload(payload: &str) -> Option<SessionValues> {
    let json = urlencoding::decode(payload).ok()?;
    serde_json::from_str(&json).ok()
}
