//! # Credentials
//!
//! The data model shared by the issuing and the verifying side.
//!
//! A credential travels as a single JSON object:
//!
//! ```text
//! {"id":..,"name":..,"contact":..,"email":..,"issuedAtMillis":..,"nonce":..,"signature":..}
//! ```
//!
//! The signature covers the compact JSON serialization of the first six
//! fields in exactly this order. The order is fixed by the field order of
//! [`CredentialPayload`].

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::Millis;

pub mod issuer;
pub mod verifier;

/// Identity data of an employee, owned by the employee directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeRecord {
    /// Directory identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Phone number or other contact handle.
    pub contact: String,
    /// E-mail address.
    pub email: String,
}

impl EmployeeRecord {
    /// Creates a new record.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        contact: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            contact: contact.into(),
            email: email.into(),
        }
    }
}

/// The signed part of a credential.
///
/// Unknown fields are rejected on deserialization so that nothing unsigned
/// can ride along with a valid signature.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CredentialPayload {
    id: String,
    name: String,
    contact: String,
    email: String,
    issued_at_millis: Millis,
    nonce: String,
}

impl CredentialPayload {
    pub(crate) fn new(employee: &EmployeeRecord, issued_at_millis: Millis, nonce: String) -> Self {
        Self {
            id: employee.id.clone(),
            name: employee.name.clone(),
            contact: employee.contact.clone(),
            email: employee.email.clone(),
            issued_at_millis,
            nonce,
        }
    }

    /// Serializes the payload into the byte layout the signature covers.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn canonical_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Returns the employee the credential was issued for.
    #[must_use]
    pub fn employee(&self) -> EmployeeRecord {
        EmployeeRecord {
            id: self.id.clone(),
            name: self.name.clone(),
            contact: self.contact.clone(),
            email: self.email.clone(),
        }
    }

    /// Returns the employee id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the issuance time in milliseconds since the Unix epoch.
    #[must_use]
    pub const fn issued_at_millis(&self) -> Millis {
        self.issued_at_millis
    }

    /// Returns the nonce.
    #[must_use]
    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    /// Whether the credential was issued no longer than `window` before
    /// `now_millis`.
    ///
    /// Timestamps in the future are not considered fresh.
    #[must_use]
    pub fn issued_within(&self, now_millis: Millis, window: Duration) -> bool {
        let window = u64::try_from(window.as_millis()).unwrap_or(u64::MAX);
        now_millis
            .checked_sub(self.issued_at_millis)
            .is_some_and(|age| age <= window)
    }
}

/// A payload together with its signature.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SignedCredential {
    #[serde(flatten)]
    payload: CredentialPayload,
    signature: String,
}

impl SignedCredential {
    pub(crate) const fn new(payload: CredentialPayload, signature: String) -> Self {
        Self { payload, signature }
    }

    /// Returns the signed payload.
    #[must_use]
    pub const fn payload(&self) -> &CredentialPayload {
        &self.payload
    }

    /// Returns the hex signature.
    #[must_use]
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Serializes the credential into the text that is encoded into the
    /// scannable code.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
