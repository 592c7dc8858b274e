//! Common error types

use thiserror::Error;

/// Errors that can occur when generating a nonce.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum NonceError {
    #[error("Nonce length must be positive")]
    /// Error when a zero-length nonce is requested.
    InvalidLength,
    #[error("Secure randomness is unavailable")]
    /// Error when the secure random source cannot produce bytes.
    RandomnessUnavailable,
}

/// Reasons an issuance fails after entropy was obtained.
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
pub enum IssuanceFailure {
    #[error("The payload could not be serialized")]
    /// Error when the canonical serialization of the payload fails.
    Serialization,
    #[error("The attestation step failed")]
    /// Error when the attestation step rejects the employee.
    Attestation,
    #[error("The configured nonce length is invalid")]
    /// Error when the issuer was configured with a zero nonce length.
    NonceLength,
}

/// Errors that can occur when issuing a credential.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum IssueCredentialError {
    #[error("Secure randomness is unavailable")]
    /// Error when no nonce could be drawn from the secure random source.
    RandomnessUnavailable,
    #[error("Issuance failed: {0}")]
    /// Error when building, signing or attesting the credential fails.
    IssuanceFailed(IssuanceFailure),
}

impl IssueCredentialError {
    /// Whether the caller may simply invoke `issue` again.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        // No partial state survives a failure, so every variant is retryable.
        true
    }
}

impl From<NonceError> for IssueCredentialError {
    fn from(err: NonceError) -> Self {
        match err {
            NonceError::RandomnessUnavailable => Self::RandomnessUnavailable,
            NonceError::InvalidLength => Self::IssuanceFailed(IssuanceFailure::NonceLength),
        }
    }
}

/// Errors that can occur when loading or checking the configuration.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("No shared secret configured")]
    /// Error when the shared secret is not set.
    MissingSecret,
    #[error("The shared secret is empty")]
    /// Error when the shared secret is the empty string.
    EmptySecret,
    #[error("The expiry window must be at least one second")]
    /// Error when the expiry window is shorter than one tick.
    InvalidWindow,
    #[error("The nonce length must be positive")]
    /// Error when the nonce length is zero.
    InvalidNonceLength,
    #[error("Invalid value for {key}")]
    /// Error when an environment variable cannot be parsed.
    InvalidValue {
        /// Name of the offending variable.
        key: String,
    },
    #[error("Issuing and verifying sides use different secrets")]
    /// Error when two secrets that must agree differ.
    SecretMismatch,
}

/// Defects of the expiry clock lifecycle.
///
/// These never reach the user. They indicate a leaked timer or a crashed
/// clock task and are logged as programming errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ClockTeardownError {
    #[error("Expiry clock {generation} ticked after cancellation")]
    /// Error when a periodic tick woke up after its clock was cancelled.
    TickAfterCancel {
        /// Generation of the leaked clock.
        generation: u64,
    },
    #[error("Expiry clock {generation} panicked")]
    /// Error when the clock task terminated abnormally.
    Panicked {
        /// Generation of the crashed clock.
        generation: u64,
    },
}
