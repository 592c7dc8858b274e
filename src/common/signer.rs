//! Binding of a payload to the shared secret.
//!
//! The signature is `hex(SHA-256(payload || secret))`, the scheme deployed
//! clients already produce. It is a plain digest over a concatenation, not a
//! keyed MAC, and inherits the length-extension properties of SHA-256.
//! Moving to HMAC-SHA256 requires switching issuer and verifier together.

use sha2::{Digest, Sha256};

/// Signs `payload` with `secret`.
///
/// Pure and deterministic: the same inputs produce the same lowercase hex
/// string on every machine.
#[must_use]
pub fn sign(payload: &str, secret: &str) -> String {
    tracing::debug!(payload_bytes = payload.len(), "signing payload");
    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Checks that `signature` is exactly [`sign`]`(payload, secret)`.
#[must_use]
pub fn signature_matches(payload: &str, secret: &str, signature: &str) -> bool {
    sign(payload, secret).as_bytes() == signature.as_bytes()
}
