//! Verifying side of the credential protocol.
//!
//! Verification is stateless: it only needs the shared secret. It never
//! fails with an error; every input maps to a [`VerificationResult`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::common::{
    config::{CredentialConfig, SharedSecret},
    errors::ConfigError,
    nonce::EntropySource,
    signer::signature_matches,
};

use super::{
    CredentialPayload,
    issuer::{Attestation, Issuer},
};

const SIGNATURE_FIELD: &str = "signature";

/// Outcome of verifying received text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerificationResult {
    /// The signature matches the payload.
    Valid(CredentialPayload),
    /// The text is a JSON object, but the signature is missing, the payload
    /// is incomplete, or the signature does not match.
    Invalid,
    /// The text is not a JSON object.
    Malformed,
}

impl VerificationResult {
    /// Whether the credential is authentic.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    /// Returns the verified payload, if any.
    #[must_use]
    pub const fn payload(&self) -> Option<&CredentialPayload> {
        match self {
            Self::Valid(payload) => Some(payload),
            Self::Invalid | Self::Malformed => None,
        }
    }

    /// Returns the display status of this result.
    #[must_use]
    pub const fn status(&self) -> VerificationStatus {
        match self {
            Self::Valid(_) => VerificationStatus::Valid,
            Self::Invalid => VerificationStatus::Invalid,
            Self::Malformed => VerificationStatus::Malformed,
        }
    }
}

/// What a verifying screen shows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VerificationStatus {
    /// Nothing has been checked yet.
    #[default]
    NotVerified,
    /// The last check succeeded.
    Valid,
    /// The last check found a signature mismatch.
    Invalid,
    /// The last input could not be read.
    Malformed,
}

impl VerificationStatus {
    /// User facing message. Never reveals which field of a payload differs.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::NotVerified => "not yet verified",
            Self::Valid => "signature valid",
            Self::Invalid => "signature mismatch",
            Self::Malformed => "unreadable code",
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Result of a barcode scan as delivered by the camera collaborator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanEvent {
    /// Symbology reported by the scanner, e.g. `qr`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Decoded text.
    pub data: String,
}

/// Checks received credentials against the shared secret.
#[derive(Clone, Debug)]
pub struct Verifier {
    secret: SharedSecret,
}

impl Verifier {
    /// Creates a verifier from the deployment configuration.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn new(config: &CredentialConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        tracing::info!(secret = %config.secret().fingerprint(), "verifier initialized");
        Ok(Self {
            secret: config.secret().clone(),
        })
    }

    /// Creates a verifier that checks against the secret `issuer` signs with.
    #[must_use]
    pub fn for_issuer<A: Attestation, E: EntropySource>(issuer: &Issuer<A, E>) -> Self {
        Self {
            secret: issuer.secret().clone(),
        }
    }

    /// Returns the secret this verifier checks against.
    #[must_use]
    pub const fn secret(&self) -> &SharedSecret {
        &self.secret
    }

    /// Verifies untrusted text.
    ///
    /// The `signature` field is split off, the remaining fields are
    /// re-serialized canonically, and the recomputed signature must equal the
    /// received one byte for byte.
    #[must_use]
    #[tracing::instrument(skip_all, fields(received_bytes = received.len()))]
    pub fn verify(&self, received: &str) -> VerificationResult {
        let result = self.verify_inner(received);
        match &result {
            VerificationResult::Valid(payload) => {
                tracing::info!(employee = %payload.id(), "credential verified");
            }
            VerificationResult::Invalid => tracing::warn!("credential signature mismatch"),
            VerificationResult::Malformed => tracing::warn!("credential unreadable"),
        }
        result
    }

    /// Verifies the text delivered by a barcode scan.
    #[must_use]
    pub fn verify_scan(&self, scan: &ScanEvent) -> VerificationResult {
        tracing::debug!(kind = %scan.kind, "scanned code");
        self.verify(&scan.data)
    }

    fn verify_inner(&self, received: &str) -> VerificationResult {
        let Ok(Value::Object(mut fields)) = serde_json::from_str::<Value>(received) else {
            return VerificationResult::Malformed;
        };
        let Some(Value::String(signature)) = fields.remove(SIGNATURE_FIELD) else {
            return VerificationResult::Invalid;
        };
        let Ok(payload) = serde_json::from_value::<CredentialPayload>(Value::Object(fields)) else {
            return VerificationResult::Invalid;
        };
        let Ok(canonical) = payload.canonical_json() else {
            return VerificationResult::Invalid;
        };
        if signature_matches(&canonical, self.secret.expose(), &signature) {
            VerificationResult::Valid(payload)
        } else {
            VerificationResult::Invalid
        }
    }
}
