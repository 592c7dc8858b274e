//! Configuration shared by the issuing and the verifying side.

use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::{fmt, str::FromStr, time::Duration};

use super::errors::ConfigError;
use crate::{DEFAULT_ATTESTATION_DELAY_MS, DEFAULT_EXPIRY_WINDOW_SECS, DEFAULT_NONCE_LENGTH};

/// Environment variable holding the shared secret.
pub const ENV_SECRET: &str = "STAFFPASS_SECRET";
/// Environment variable holding the expiry window in seconds.
pub const ENV_EXPIRY_WINDOW_SECS: &str = "STAFFPASS_EXPIRY_WINDOW_SECS";
/// Environment variable holding the attestation delay in milliseconds.
pub const ENV_ATTESTATION_DELAY_MS: &str = "STAFFPASS_ATTESTATION_DELAY_MS";
/// Environment variable holding the nonce length in bytes.
pub const ENV_NONCE_BYTES: &str = "STAFFPASS_NONCE_BYTES";

/// The secret both sides append to the payload before hashing.
///
/// Read-only once constructed. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct SharedSecret(String);

impl SharedSecret {
    /// Wraps a secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Returns the raw secret.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Short, non-reversible identifier of the secret.
    ///
    /// Lets operators compare which secret two deployments run with.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0.as_bytes());
        hex::encode(&digest[..4])
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SharedSecret")
            .field(&self.fingerprint())
            .finish()
    }
}

/// Fails unless both secrets are identical.
///
/// # Errors
/// Returns [`ConfigError::SecretMismatch`] if the secrets differ.
pub fn ensure_same_secret(issuing: &SharedSecret, verifying: &SharedSecret) -> Result<(), ConfigError> {
    if issuing == verifying {
        Ok(())
    } else {
        tracing::error!(
            issuing = %issuing.fingerprint(),
            verifying = %verifying.fingerprint(),
            "secret mismatch"
        );
        Err(ConfigError::SecretMismatch)
    }
}

/// Settings of a credential deployment.
#[derive(Clone, Debug, Deserialize)]
pub struct CredentialConfig {
    secret: SharedSecret,
    #[serde(default = "default_expiry_window_secs")]
    expiry_window_secs: u64,
    #[serde(default = "default_attestation_delay_ms")]
    attestation_delay_ms: u64,
    #[serde(default = "default_nonce_length")]
    nonce_length: usize,
}

const fn default_expiry_window_secs() -> u64 {
    DEFAULT_EXPIRY_WINDOW_SECS
}

const fn default_attestation_delay_ms() -> u64 {
    DEFAULT_ATTESTATION_DELAY_MS
}

const fn default_nonce_length() -> usize {
    DEFAULT_NONCE_LENGTH
}

impl CredentialConfig {
    /// Creates a configuration with the given secret and default settings.
    #[must_use]
    pub const fn new(secret: SharedSecret) -> Self {
        Self {
            secret,
            expiry_window_secs: DEFAULT_EXPIRY_WINDOW_SECS,
            attestation_delay_ms: DEFAULT_ATTESTATION_DELAY_MS,
            nonce_length: DEFAULT_NONCE_LENGTH,
        }
    }

    /// Loads the configuration from the process environment.
    ///
    /// # Errors
    /// Returns an error if the secret is missing or a value does not parse
    /// or validate.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the configuration through `lookup`, which maps variable names
    /// to values.
    ///
    /// # Errors
    /// See [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup(ENV_SECRET).ok_or(ConfigError::MissingSecret)?;
        let mut config = Self::new(SharedSecret::new(secret));
        if let Some(window) = parse_var(&lookup, ENV_EXPIRY_WINDOW_SECS)? {
            config.expiry_window_secs = window;
        }
        if let Some(delay) = parse_var(&lookup, ENV_ATTESTATION_DELAY_MS)? {
            config.attestation_delay_ms = delay;
        }
        if let Some(length) = parse_var(&lookup, ENV_NONCE_BYTES)? {
            config.nonce_length = length;
        }
        config.validate()?;
        Ok(config)
    }

    /// Checks the invariants of the configuration.
    ///
    /// # Errors
    /// Returns an error for an empty secret, a zero expiry window or a zero
    /// nonce length.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret.expose().is_empty() {
            return Err(ConfigError::EmptySecret);
        }
        if self.expiry_window_secs == 0 {
            return Err(ConfigError::InvalidWindow);
        }
        if self.nonce_length == 0 {
            return Err(ConfigError::InvalidNonceLength);
        }
        Ok(())
    }

    /// Sets the expiry window, truncated to whole seconds.
    ///
    /// A window shorter than one second becomes zero and fails
    /// [`validate`](Self::validate).
    #[must_use]
    pub fn with_expiry_window(mut self, window: Duration) -> Self {
        self.expiry_window_secs = window.as_secs();
        self
    }

    /// Sets the attestation delay.
    #[must_use]
    pub fn with_attestation_delay(mut self, delay: Duration) -> Self {
        self.attestation_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Sets the nonce length in bytes.
    #[must_use]
    pub fn with_nonce_length(mut self, nonce_length: usize) -> Self {
        self.nonce_length = nonce_length;
        self
    }

    /// Returns the shared secret.
    #[must_use]
    pub const fn secret(&self) -> &SharedSecret {
        &self.secret
    }

    /// Returns how long an issued credential stays presentable.
    #[must_use]
    pub const fn expiry_window(&self) -> Duration {
        Duration::from_secs(self.expiry_window_secs)
    }

    /// Returns the latency of the simulated attestation step.
    #[must_use]
    pub const fn attestation_delay(&self) -> Duration {
        Duration::from_millis(self.attestation_delay_ms)
    }

    /// Returns the nonce length in bytes.
    #[must_use]
    pub const fn nonce_length(&self) -> usize {
        self.nonce_length
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .map(|raw| {
            raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = CredentialConfig::from_lookup(lookup(&[(ENV_SECRET, "s3cret")])).unwrap();
        assert_eq!(config.secret().expose(), "s3cret");
        assert_eq!(config.expiry_window(), Duration::from_secs(60));
        assert_eq!(config.attestation_delay(), Duration::from_millis(700));
        assert_eq!(config.nonce_length(), 16);
    }

    #[test]
    fn overrides() {
        let config = CredentialConfig::from_lookup(lookup(&[
            (ENV_SECRET, "s3cret"),
            (ENV_EXPIRY_WINDOW_SECS, "30"),
            (ENV_ATTESTATION_DELAY_MS, "0"),
            (ENV_NONCE_BYTES, " 32 "),
        ]))
        .unwrap();
        assert_eq!(config.expiry_window(), Duration::from_secs(30));
        assert_eq!(config.attestation_delay(), Duration::ZERO);
        assert_eq!(config.nonce_length(), 32);
    }

    #[test]
    fn rejects_bad_values() {
        assert_eq!(
            CredentialConfig::from_lookup(lookup(&[])).unwrap_err(),
            ConfigError::MissingSecret
        );
        assert_eq!(
            CredentialConfig::from_lookup(lookup(&[(ENV_SECRET, "")])).unwrap_err(),
            ConfigError::EmptySecret
        );
        assert_eq!(
            CredentialConfig::from_lookup(lookup(&[
                (ENV_SECRET, "s"),
                (ENV_EXPIRY_WINDOW_SECS, "0")
            ]))
            .unwrap_err(),
            ConfigError::InvalidWindow
        );
        assert_eq!(
            CredentialConfig::from_lookup(lookup(&[(ENV_SECRET, "s"), (ENV_NONCE_BYTES, "x")]))
                .unwrap_err(),
            ConfigError::InvalidValue {
                key: ENV_NONCE_BYTES.to_string()
            }
        );
    }

    #[test]
    fn window_truncates_to_whole_seconds() {
        let config = CredentialConfig::new(SharedSecret::new("s3cret"))
            .with_expiry_window(Duration::from_millis(1_500));
        assert_eq!(config.expiry_window(), Duration::from_secs(1));
        assert!(config.validate().is_ok());

        let config = config.with_expiry_window(Duration::from_millis(500));
        assert_eq!(config.validate(), Err(ConfigError::InvalidWindow));
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: CredentialConfig =
            serde_json::from_str(r#"{"secret":"s3cret","expiry_window_secs":5}"#).unwrap();
        assert_eq!(config.secret(), &SharedSecret::new("s3cret"));
        assert_eq!(config.expiry_window(), Duration::from_secs(5));
        assert_eq!(config.nonce_length(), 16);
    }

    #[test]
    fn debug_hides_secret() {
        let secret = SharedSecret::new("hunter2");
        let printed = format!("{secret:?}");
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains(&secret.fingerprint()));
        assert_eq!(secret.fingerprint().len(), 8);
    }

    #[test]
    fn secret_consistency() {
        let a = SharedSecret::new("one");
        assert!(ensure_same_secret(&a, &a.clone()).is_ok());
        assert_eq!(
            ensure_same_secret(&a, &SharedSecret::new("two")),
            Err(ConfigError::SecretMismatch)
        );
    }
}
