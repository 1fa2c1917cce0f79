//! Webhook signature verification.
//!
//! GitHub signs every delivery with HMAC-SHA256 over the raw body and sends
//! the result as `X-Hub-Signature-256: sha256=<hex>`. Deliveries are verified
//! before their body is parsed.

use std::fmt;

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Splits a `sha256=<hex>` header into raw signature bytes.
///
/// Returns `None` for a missing prefix, another algorithm or invalid hex.
pub fn parse_signature_header(header: &str) -> Option<Vec<u8>> {
    hex::decode(header.strip_prefix("sha256=")?).ok()
}

/// The shared webhook secret.
///
/// `Debug` never prints the secret itself.
#[derive(Clone)]
pub struct WebhookSecret(Vec<u8>);

impl WebhookSecret {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        WebhookSecret(secret.into())
    }

    /// Checks `signature_header` against `payload` in constant time.
    pub fn verify(&self, payload: &[u8], signature_header: &str) -> bool {
        let Some(expected) = parse_signature_header(signature_header) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(&self.0) else {
            return false;
        };
        mac.update(payload);
        mac.verify_slice(&expected).is_ok()
    }

    /// The header GitHub would send for `payload`.
    #[cfg(test)]
    pub fn sign(&self, payload: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.0).expect("HMAC accepts any key length");
        mac.update(payload);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }
}

impl fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WebhookSecret(..)")
    }
}
