//! Once-per-second driver of a [`Countdown`].
//!
//! Every [`ExpiryClock`] owns one tokio task. The task wakes once per second,
//! recomputes the remaining time from the absolute time elapsed since the
//! start (so a late wake-up collapses missed ticks instead of drifting), and
//! publishes the new [`ExpiryState`] on a watch channel.
//!
//! Cancellation is synchronous: once [`ExpiryClock::cancel`] returns, no tick
//! can change the state any more. Dropping the clock cancels it.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};

use super::{Countdown, ExpiryState, Phase};
use crate::common::errors::ClockTeardownError;

const TICK: Duration = Duration::from_secs(1);

#[derive(Debug)]
struct Shared {
    countdown: Countdown,
    cancelled: bool,
    ticks: u64,
    publisher: watch::Sender<ExpiryState>,
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A running countdown for one credential.
#[derive(Debug)]
pub struct ExpiryClock {
    generation: u64,
    shared: Arc<Mutex<Shared>>,
    state: watch::Receiver<ExpiryState>,
    task: Option<JoinHandle<()>>,
}

impl ExpiryClock {
    /// Starts an active countdown over `window`.
    ///
    /// `on_expire` runs once, on the clock task, right after the state turned
    /// [`Phase::Expired`]. It does not run if the clock is cancelled first.
    ///
    /// # Panics
    /// Panics if called outside of a tokio runtime.
    pub fn start<F>(generation: u64, window: Duration, on_expire: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let mut countdown = Countdown::new(window);
        let initial = countdown.start();
        let (publisher, state) = watch::channel(initial);
        let shared = Arc::new(Mutex::new(Shared {
            countdown,
            cancelled: false,
            ticks: 0,
            publisher,
        }));
        tracing::info!(generation, window_secs = window.as_secs(), "expiry clock started");
        let task = tokio::spawn(run(generation, Arc::clone(&shared), Instant::now(), on_expire));
        Self {
            generation,
            shared,
            state,
            task: Some(task),
        }
    }

    /// Returns the generation this clock was started with.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns the latest published state.
    #[must_use]
    pub fn state(&self) -> ExpiryState {
        *self.state.borrow()
    }

    /// Returns a receiver that observes every published state.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ExpiryState> {
        self.state.clone()
    }

    /// Returns how many ticks have been applied.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        lock(&self.shared).ticks
    }

    /// Whether the clock task is still alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stops the clock. No tick is applied after this returns.
    pub fn cancel(&mut self) {
        {
            let mut shared = lock(&self.shared);
            if shared.cancelled {
                return;
            }
            shared.cancelled = true;
        }
        if let Some(task) = &self.task {
            task.abort();
        }
        tracing::info!(generation = self.generation, "expiry clock cancelled");
    }

    /// Cancels the clock and waits for its task to end.
    ///
    /// # Errors
    /// Returns [`ClockTeardownError::Panicked`] if the task crashed.
    pub async fn shutdown(mut self) -> Result<(), ClockTeardownError> {
        self.cancel();
        let Some(task) = self.task.take() else {
            return Ok(());
        };
        match task.await {
            Ok(()) => Ok(()),
            Err(err) if err.is_cancelled() => Ok(()),
            Err(_) => {
                let err = ClockTeardownError::Panicked {
                    generation: self.generation,
                };
                tracing::error!(%err, "expiry clock teardown");
                Err(err)
            }
        }
    }
}

impl Drop for ExpiryClock {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn run<F>(generation: u64, shared: Arc<Mutex<Shared>>, started: Instant, on_expire: F)
where
    F: FnOnce() + Send + 'static,
{
    let mut interval = time::interval_at(started + TICK, TICK);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        interval.tick().await;
        let state = {
            let mut shared = lock(&shared);
            if shared.cancelled {
                let err = ClockTeardownError::TickAfterCancel { generation };
                tracing::error!(%err, "expiry clock teardown");
                return;
            }
            let state = shared.countdown.sync_to(started.elapsed());
            shared.ticks += 1;
            shared.publisher.send_modify(|current| *current = state);
            state
        };
        tracing::trace!(generation, remaining = state.remaining_seconds, "tick");
        if state.phase == Phase::Expired {
            tracing::info!(generation, "credential expired");
            on_expire();
            return;
        }
    }
}
