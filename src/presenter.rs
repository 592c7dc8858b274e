//! The issuing side's display context.
//!
//! A [`PresentingContext`] stands for one screen that shows a credential to
//! be scanned. It owns at most one live [`ExpiryClock`]. Issuing again
//! cancels the current clock before anything else happens, and dropping the
//! context cancels it as well.

use rand::rngs::OsRng;
use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use tokio::sync::watch;

use crate::{
    common::{
        config::CredentialConfig,
        errors::{ClockTeardownError, ConfigError, IssueCredentialError},
        nonce::EntropySource,
    },
    credential::{
        EmployeeRecord, SignedCredential,
        issuer::{Attestation, Issuer, SimulatedAttestation},
    },
    expiry::{ExpiryState, Phase, Urgency, clock::ExpiryClock},
};

/// What the presenting screen shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PresentationStatus {
    /// Nothing has been issued, or the last issuance failed.
    NotIssued,
    /// A credential is on display.
    Presenting {
        /// Whole seconds until expiry.
        remaining_seconds: u64,
        /// Display band of the countdown.
        urgency: Urgency,
    },
    /// The last credential expired and is no longer shown.
    Expired,
}

#[derive(Debug, Default)]
struct Display {
    generation: u64,
    current: Option<SignedCredential>,
    last_issued: Option<SignedCredential>,
}

fn lock(display: &Mutex<Display>) -> MutexGuard<'_, Display> {
    display.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One presenting screen: issues credentials and keeps the latest on
/// display until its window runs out.
#[derive(Debug)]
pub struct PresentingContext<A: Attestation = SimulatedAttestation, E: EntropySource = OsRng> {
    issuer: Arc<Issuer<A, E>>,
    window: Duration,
    generation: u64,
    display: Arc<Mutex<Display>>,
    clock: Option<ExpiryClock>,
}

impl PresentingContext {
    /// Creates a context with its own default [`Issuer`].
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn from_config(config: &CredentialConfig) -> Result<Self, ConfigError> {
        Self::new(Arc::new(Issuer::new(config)?), config.expiry_window())
    }
}

impl<A: Attestation, E: EntropySource> PresentingContext<A, E> {
    /// Creates a context that shows credentials from `issuer` for `window`.
    ///
    /// The issuer may be shared with other contexts. The window counts in
    /// whole seconds; fractions are truncated.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidWindow`] if `window` is shorter than one
    /// second.
    pub fn new(issuer: Arc<Issuer<A, E>>, window: Duration) -> Result<Self, ConfigError> {
        if window.as_secs() == 0 {
            return Err(ConfigError::InvalidWindow);
        }
        Ok(Self {
            issuer,
            window,
            generation: 0,
            display: Arc::new(Mutex::new(Display::default())),
            clock: None,
        })
    }

    /// Issues a credential for `employee` and starts its expiry clock.
    ///
    /// Any credential on display is withdrawn and its clock cancelled before
    /// the issuer is called. On failure no clock is started and nothing is
    /// put on display.
    ///
    /// # Errors
    /// Propagates the issuer's error.
    pub async fn issue(
        &mut self,
        employee: &EmployeeRecord,
    ) -> Result<SignedCredential, IssueCredentialError> {
        self.generation += 1;
        let generation = self.generation;
        self.stop_clock();
        {
            let mut display = lock(&self.display);
            display.generation = generation;
            display.current = None;
        }

        let credential = self.issuer.issue(employee).await?;

        {
            let mut display = lock(&self.display);
            display.current = Some(credential.clone());
            display.last_issued = Some(credential.clone());
        }
        let display = Arc::clone(&self.display);
        self.clock = Some(ExpiryClock::start(generation, self.window, move || {
            let mut display = lock(&display);
            if display.generation == generation {
                display.current = None;
            }
        }));
        Ok(credential)
    }

    /// Returns the credential currently offered for display.
    #[must_use]
    pub fn displayed(&self) -> Option<SignedCredential> {
        lock(&self.display).current.clone()
    }

    /// Returns the last credential issued, even if it has expired.
    #[must_use]
    pub fn last_issued(&self) -> Option<SignedCredential> {
        lock(&self.display).last_issued.clone()
    }

    /// Returns the state of the current expiry clock.
    #[must_use]
    pub fn expiry_state(&self) -> ExpiryState {
        self.clock
            .as_ref()
            .map_or_else(ExpiryState::pending, ExpiryClock::state)
    }

    /// Returns what the screen should show.
    #[must_use]
    pub fn status(&self) -> PresentationStatus {
        let state = self.expiry_state();
        match state.phase {
            Phase::Pending => PresentationStatus::NotIssued,
            Phase::Active => PresentationStatus::Presenting {
                remaining_seconds: state.remaining_seconds,
                urgency: Urgency::from_remaining(state.remaining_seconds),
            },
            Phase::Expired => PresentationStatus::Expired,
        }
    }

    /// Returns a receiver for the ticks of the current clock, if any.
    #[must_use]
    pub fn subscribe(&self) -> Option<watch::Receiver<ExpiryState>> {
        self.clock.as_ref().map(ExpiryClock::subscribe)
    }

    /// Stops the current clock and withdraws the displayed credential.
    pub fn teardown(&mut self) {
        self.stop_clock();
        lock(&self.display).current = None;
    }

    /// Tears the context down and waits for its clock task to end.
    ///
    /// # Errors
    /// Returns an error if the clock task crashed.
    pub async fn shutdown(mut self) -> Result<(), ClockTeardownError> {
        lock(&self.display).current = None;
        match self.clock.take() {
            Some(clock) => clock.shutdown().await,
            None => Ok(()),
        }
    }

    fn stop_clock(&mut self) {
        if let Some(mut clock) = self.clock.take() {
            clock.cancel();
        }
    }
}
