//! # Staffpass
//!
//! Short-lived, signed identity credentials for employees.
//!
//! The issuing side turns an [`EmployeeRecord`](credential::EmployeeRecord)
//! into a [`SignedCredential`](credential::SignedCredential) and keeps it on
//! display for a fixed window, driven by an [`ExpiryClock`](expiry::clock::ExpiryClock).
//! The verifying side receives the credential as text (from a barcode scan or
//! a manual paste) and recomputes the signature.
//!
//! The two sides never share in-memory state. They only share the
//! [`SharedSecret`](common::config::SharedSecret) and the digest scheme of
//! [`sign`](common::signer::sign).
//!
//!  - [`common`]: configuration, errors, nonces and the signer
//!  - [`credential`]: the data model, the issuer and the verifier
//!  - [`expiry`]: the countdown state machine and its periodic driver
//!  - [`presenter`]: the issuing side's display context

#![warn(missing_docs)]
#![deny(unreachable_pub)]
#![deny(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod common;
pub mod credential;
pub mod expiry;
pub mod presenter;
#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use common::config::{CredentialConfig, SharedSecret};
pub use credential::{
    CredentialPayload, EmployeeRecord, SignedCredential,
    issuer::{Attestation, Issuer, SimulatedAttestation},
    verifier::{ScanEvent, VerificationResult, VerificationStatus, Verifier},
};
pub use expiry::{ExpiryState, Phase, Urgency};
pub use presenter::{PresentationStatus, PresentingContext};

/// Milliseconds since the Unix epoch.
pub type Millis = u64;

/// Default number of random bytes in a nonce (128 bits).
pub const DEFAULT_NONCE_LENGTH: usize = 16;

/// Default presentability window of a credential, in seconds.
pub const DEFAULT_EXPIRY_WINDOW_SECS: u64 = 60;

/// Default latency of the simulated attestation step, in milliseconds.
pub const DEFAULT_ATTESTATION_DELAY_MS: u64 = 700;

pub(crate) fn now_millis() -> Millis {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
