//! Issuing side of the credential protocol.

use async_trait::async_trait;
use rand::rngs::OsRng;
use std::{fmt::Debug, time::Duration};
use thiserror::Error;

use crate::{
    common::{
        config::{CredentialConfig, SharedSecret},
        errors::{ConfigError, IssuanceFailure, IssueCredentialError},
        nonce::{EntropySource, NonceSource},
        signer::sign,
    },
    now_millis,
};

use super::{CredentialPayload, EmployeeRecord, SignedCredential};

/// Error returned by an [`Attestation`] that refuses an employee.
#[derive(Error, Debug, PartialEq, Eq)]
#[error("Attestation refused: {reason}")]
pub struct AttestationError {
    /// Human readable reason.
    pub reason: String,
}

/// A step the issuer awaits before producing a credential, e.g. a round trip
/// to a remote service vouching for the employee.
#[async_trait]
pub trait Attestation: Send + Sync + Debug {
    /// Vouches for `employee`.
    async fn attest(&self, employee: &EmployeeRecord) -> Result<(), AttestationError>;
}

/// Attestation that accepts every employee after a fixed latency.
#[derive(Debug, Clone, Copy)]
pub struct SimulatedAttestation {
    delay: Duration,
}

impl SimulatedAttestation {
    /// Creates an attestation that answers after `delay`.
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl Attestation for SimulatedAttestation {
    async fn attest(&self, _employee: &EmployeeRecord) -> Result<(), AttestationError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(())
    }
}

/// Produces signed credentials.
///
/// `issue` takes `&self`, so a single issuer can serve any number of
/// concurrent issuances.
#[derive(Debug)]
pub struct Issuer<A: Attestation = SimulatedAttestation, E: EntropySource = OsRng> {
    secret: SharedSecret,
    nonce_length: usize,
    nonces: NonceSource<E>,
    attestation: A,
}

impl Issuer {
    /// Creates an issuer using the system CSPRNG and a
    /// [`SimulatedAttestation`] with the configured delay.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn new(config: &CredentialConfig) -> Result<Self, ConfigError> {
        Self::with_parts(
            config,
            SimulatedAttestation::new(config.attestation_delay()),
            OsRng,
        )
    }
}

impl<A: Attestation, E: EntropySource> Issuer<A, E> {
    /// Creates an issuer from explicit attestation and entropy sources.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn with_parts(
        config: &CredentialConfig,
        attestation: A,
        entropy: E,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        tracing::info!(
            secret = %config.secret().fingerprint(),
            nonce_length = config.nonce_length(),
            "issuer initialized"
        );
        Ok(Self {
            secret: config.secret().clone(),
            nonce_length: config.nonce_length(),
            nonces: NonceSource::with_entropy(entropy),
            attestation,
        })
    }

    /// Returns the secret this issuer signs with.
    #[must_use]
    pub const fn secret(&self) -> &SharedSecret {
        &self.secret
    }

    /// Returns the attestation step run before every issuance.
    #[must_use]
    pub const fn attestation(&self) -> &A {
        &self.attestation
    }

    /// Issues a signed credential for `employee`.
    ///
    /// Awaits the attestation step, then stamps the current time and a fresh
    /// nonce onto the employee's fields and signs the canonical serialization.
    /// Nothing is returned or retained if any step fails.
    ///
    /// # Errors
    /// Returns [`IssueCredentialError::RandomnessUnavailable`] if no nonce
    /// could be drawn and [`IssueCredentialError::IssuanceFailed`] if
    /// attestation or serialization fails.
    #[tracing::instrument(level = "info", skip_all, fields(employee = %employee.id))]
    pub async fn issue(
        &self,
        employee: &EmployeeRecord,
    ) -> Result<SignedCredential, IssueCredentialError> {
        self.attestation.attest(employee).await.map_err(|err| {
            tracing::warn!(%err, "attestation failed");
            IssueCredentialError::IssuanceFailed(IssuanceFailure::Attestation)
        })?;

        let issued_at_millis = now_millis();
        let nonce = self.nonces.generate(self.nonce_length)?;
        let payload = CredentialPayload::new(employee, issued_at_millis, nonce);

        // signature = SHA256(canonical_json || secret)
        let canonical = payload
            .canonical_json()
            .map_err(|_| IssueCredentialError::IssuanceFailed(IssuanceFailure::Serialization))?;
        let signature = sign(&canonical, self.secret.expose());

        tracing::info!(issued_at_millis, "credential issued");
        Ok(SignedCredential::new(payload, signature))
    }
}
