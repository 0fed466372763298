//! `x-line-signature` handling.
//!
//! The signature is the base64-encoded HMAC-SHA256 digest of the raw request
//! body keyed by the channel secret.

use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

pub const SIGNATURE_HEADER: &str = "x-line-signature";

type HmacSha256 = Hmac<Sha256>;

pub fn compute_signature(channel_secret: &str, body: &[u8]) -> Result<String, &'static str> {
    let mut mac = HmacSha256::new_from_slice(channel_secret.as_bytes()).map_err(|_| "bad_secret")?;
    mac.update(body);
    Ok(base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
}

pub fn verify_signature(
    channel_secret: &str,
    signature: Option<&str>,
    body: &[u8],
) -> Result<(), &'static str> {
    let signature = signature
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or("missing_signature")?;
    let provided = base64::engine::general_purpose::STANDARD
        .decode(signature)
        .map_err(|_| "invalid_signature")?;

    let mut mac = HmacSha256::new_from_slice(channel_secret.as_bytes()).map_err(|_| "bad_secret")?;
    mac.update(body);
    mac.verify_slice(&provided).map_err(|_| "invalid_signature")
}
