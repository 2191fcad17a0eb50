//! HMAC-SHA256 webhook signatures

use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::error::WebhookError;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the signature
pub const SIGNATURE_HEADER: &str = "X-Webhook-Signature";

const PREFIX: &str = "sha256=";

/// Hex HMAC-SHA256 of the exact bytes that will be transmitted
pub fn sign(payload: &[u8], secret: &str) -> Result<String, WebhookError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| WebhookError::signing(e.to_string()))?;
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Value for the signature header: `sha256=<hex>`
pub fn signature_header(payload: &[u8], secret: &str) -> Result<String, WebhookError> {
    Ok(format!("{}{}", PREFIX, sign(payload, secret)?))
}

/// Constant-time check of a received signature header against the body
pub fn verify(payload: &[u8], secret: &str, header_value: &str) -> bool {
    let Some(hex_sig) = header_value.strip_prefix(PREFIX) else {
        return false;
    };
    let Ok(expected) = hex::decode(hex_sig) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };

    mac.update(payload);
    mac.verify_slice(&expected).is_ok()
}
