//! Random, URL-safe nonces.
//!
//! A nonce is drawn once per credential so that two credentials for the same
//! employee never share a signature. Bytes come from an [`EntropySource`];
//! the default source is the operating system's CSPRNG. There is no fallback
//! to a non-cryptographic generator: if the source fails, generation fails.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{RngCore, rngs::OsRng};
use std::fmt::Debug;

use super::errors::NonceError;
use crate::DEFAULT_NONCE_LENGTH;

/// A cryptographically secure source of random bytes.
///
/// Implementations must not degrade to an insecure generator when the
/// underlying source is unavailable; they report the failure instead.
pub trait EntropySource: Send + Sync + Debug {
    /// Fills `dest` with random bytes.
    ///
    /// # Errors
    /// Returns an error if the source cannot produce bytes.
    fn fill(&self, dest: &mut [u8]) -> Result<(), rand::Error>;
}

impl EntropySource for OsRng {
    fn fill(&self, dest: &mut [u8]) -> Result<(), rand::Error> {
        OsRng.try_fill_bytes(dest)
    }
}

/// Produces URL-safe nonces from an [`EntropySource`].
#[derive(Debug, Clone, Default)]
pub struct NonceSource<E: EntropySource = OsRng> {
    entropy: E,
}

impl NonceSource<OsRng> {
    /// Creates a nonce source backed by the operating system's CSPRNG.
    #[must_use]
    pub const fn new() -> Self {
        Self { entropy: OsRng }
    }
}

impl<E: EntropySource> NonceSource<E> {
    /// Creates a nonce source backed by the given entropy source.
    pub const fn with_entropy(entropy: E) -> Self {
        Self { entropy }
    }

    /// Generates a nonce from `byte_length` random bytes.
    ///
    /// The bytes are encoded as unpadded URL-safe base64 (`-` and `_` in place
    /// of `+` and `/`, no trailing `=`).
    ///
    /// # Errors
    /// Returns [`NonceError::InvalidLength`] for a zero length and
    /// [`NonceError::RandomnessUnavailable`] if the entropy source fails.
    pub fn generate(&self, byte_length: usize) -> Result<String, NonceError> {
        if byte_length == 0 {
            return Err(NonceError::InvalidLength);
        }
        let mut bytes = vec![0u8; byte_length];
        self.entropy.fill(&mut bytes).map_err(|err| {
            tracing::error!(%err, "secure random source failed");
            NonceError::RandomnessUnavailable
        })?;
        tracing::debug!(byte_length, "generated nonce");
        Ok(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Generates a nonce of [`DEFAULT_NONCE_LENGTH`] bytes.
    ///
    /// # Errors
    /// Returns [`NonceError::RandomnessUnavailable`] if the entropy source fails.
    pub fn generate_default(&self) -> Result<String, NonceError> {
        self.generate(DEFAULT_NONCE_LENGTH)
    }
}

/// Generates a nonce of `byte_length` bytes from the operating system's CSPRNG.
///
/// # Errors
/// See [`NonceSource::generate`].
pub fn generate_nonce(byte_length: usize) -> Result<String, NonceError> {
    NonceSource::new().generate(byte_length)
}
