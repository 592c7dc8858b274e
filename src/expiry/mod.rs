//! # Expiry
//!
//! How long an issued credential may be presented.
//!
//! [`Countdown`] is the pure state machine:
//!
//! ```text
//! Pending --start--> Active(window) --tick--> Active(window - 1) ... --tick--> Expired
//! ```
//!
//! Phases only move forward. A new issuance gets a new `Countdown`; an
//! expired one is never restarted. [`clock::ExpiryClock`] drives a
//! `Countdown` once per second on the tokio runtime.

use std::{fmt, time::Duration};

pub mod clock;

/// Lifecycle phase of a presented credential.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    /// No credential yet.
    Pending,
    /// The credential may be presented.
    Active,
    /// The credential must no longer be presented.
    Expired,
}

/// How close an active credential is to expiry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Urgency {
    /// More than 30 seconds left.
    Calm,
    /// More than 10 seconds left.
    Warning,
    /// 10 seconds or less left.
    Critical,
}

impl Urgency {
    /// Classifies a number of remaining seconds.
    #[must_use]
    pub const fn from_remaining(remaining_seconds: u64) -> Self {
        if remaining_seconds > 30 {
            Self::Calm
        } else if remaining_seconds > 10 {
            Self::Warning
        } else {
            Self::Critical
        }
    }
}

/// Snapshot of a countdown.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExpiryState {
    /// Whole seconds until expiry. Zero unless [`Phase::Active`].
    pub remaining_seconds: u64,
    /// Current phase.
    pub phase: Phase,
}

impl ExpiryState {
    /// The state before any credential was issued.
    #[must_use]
    pub const fn pending() -> Self {
        Self {
            remaining_seconds: 0,
            phase: Phase::Pending,
        }
    }

    const fn active(remaining_seconds: u64) -> Self {
        Self {
            remaining_seconds,
            phase: Phase::Active,
        }
    }

    const fn expired() -> Self {
        Self {
            remaining_seconds: 0,
            phase: Phase::Expired,
        }
    }

    /// Whether the credential may be presented.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.phase == Phase::Active
    }

    /// Urgency of an active state.
    #[must_use]
    pub fn urgency(&self) -> Option<Urgency> {
        self.is_active()
            .then(|| Urgency::from_remaining(self.remaining_seconds))
    }

    /// Remaining time as `m:ss`.
    #[must_use]
    pub fn label(&self) -> String {
        format!(
            "{}:{:02}",
            self.remaining_seconds / 60,
            self.remaining_seconds % 60
        )
    }
}

impl Default for ExpiryState {
    fn default() -> Self {
        Self::pending()
    }
}

impl fmt::Display for ExpiryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.phase {
            Phase::Pending => f.write_str("pending"),
            Phase::Active => write!(f, "expires in {}", self.label()),
            Phase::Expired => f.write_str("expired"),
        }
    }
}

/// Countdown state machine for a single credential.
#[derive(Clone, Debug)]
pub struct Countdown {
    window_secs: u64,
    state: ExpiryState,
}

impl Countdown {
    /// Creates a pending countdown over `window`, truncated to whole seconds.
    #[must_use]
    pub const fn new(window: Duration) -> Self {
        Self {
            window_secs: window.as_secs(),
            state: ExpiryState::pending(),
        }
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> ExpiryState {
        self.state
    }

    /// Moves a pending countdown to `Active` with the full window.
    ///
    /// Has no effect once started.
    pub fn start(&mut self) -> ExpiryState {
        if self.state.phase == Phase::Pending {
            self.state = if self.window_secs == 0 {
                ExpiryState::expired()
            } else {
                ExpiryState::active(self.window_secs)
            };
        }
        self.state
    }

    /// Advances an active countdown by one second.
    ///
    /// The running [`clock::ExpiryClock`] does not call this; it uses
    /// [`sync_to`](Self::sync_to) so that late wake-ups cannot drift.
    pub fn tick(&mut self) -> ExpiryState {
        if self.state.phase == Phase::Active {
            self.set_remaining(self.state.remaining_seconds.saturating_sub(1));
        }
        self.state
    }

    /// Aligns an active countdown with the absolute time elapsed since it
    /// started.
    ///
    /// Collapses any number of missed ticks into one step. Remaining time
    /// never grows, so a clock that jumps backwards cannot revive it.
    pub fn sync_to(&mut self, elapsed: Duration) -> ExpiryState {
        if self.state.phase == Phase::Active {
            let remaining = self.window_secs.saturating_sub(elapsed.as_secs());
            self.set_remaining(remaining.min(self.state.remaining_seconds));
        }
        self.state
    }

    fn set_remaining(&mut self, remaining_seconds: u64) {
        self.state = if remaining_seconds == 0 {
            ExpiryState::expired()
        } else {
            ExpiryState::active(remaining_seconds)
        };
    }
}
