//! Attestation steps for testing purposes.
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::credential::{
    EmployeeRecord,
    issuer::{Attestation, AttestationError},
};

/// Attestation that accepts every employee without delay and counts calls.
#[derive(Default, Debug)]
pub struct InstantAttestation {
    calls: AtomicUsize,
}

impl InstantAttestation {
    /// Returns how many employees were attested.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Attestation for InstantAttestation {
    async fn attest(&self, _employee: &EmployeeRecord) -> Result<(), AttestationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Attestation that refuses every employee.
#[derive(Default, Debug, Clone, Copy)]
pub struct RejectingAttestation;

#[async_trait]
impl Attestation for RejectingAttestation {
    async fn attest(&self, employee: &EmployeeRecord) -> Result<(), AttestationError> {
        Err(AttestationError {
            reason: format!("employee {} is not known", employee.id),
        })
    }
}
