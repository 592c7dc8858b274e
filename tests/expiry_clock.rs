use async_trait::async_trait;
use rand::rngs::OsRng;
use staffpass::{
    CredentialConfig, EmployeeRecord, ExpiryState, Issuer, Phase, PresentationStatus,
    PresentingContext, SharedSecret, Urgency, Verifier,
    common::errors::{ConfigError, IssuanceFailure, IssueCredentialError},
    credential::issuer::{Attestation, AttestationError},
    expiry::clock::ExpiryClock,
    test_utils::{
        attestation::InstantAttestation,
        employees::{ada, directory},
        entropy::UnavailableEntropy,
    },
};
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

const WINDOW: Duration = Duration::from_secs(60);

fn config() -> CredentialConfig {
    CredentialConfig::new(SharedSecret::new("shared-test-secret"))
}

fn context() -> PresentingContext<InstantAttestation, OsRng> {
    let issuer = Issuer::with_parts(&config(), InstantAttestation::default(), OsRng).unwrap();
    PresentingContext::new(Arc::new(issuer), WINDOW).unwrap()
}

/// Refuses employees whose id starts with `x`.
#[derive(Debug)]
struct DenyList;

#[async_trait]
impl Attestation for DenyList {
    async fn attest(&self, employee: &EmployeeRecord) -> Result<(), AttestationError> {
        if employee.id.starts_with('x') {
            Err(AttestationError {
                reason: "denied".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[tokio::test(start_paused = true)]
async fn countdown_cycle() {
    let mut context = context();
    assert_eq!(context.status(), PresentationStatus::NotIssued);
    assert_eq!(context.expiry_state().phase, Phase::Pending);

    // Issue: The credential is active with the full window
    let credential = context.issue(&ada()).await.unwrap();
    assert_eq!(
        context.expiry_state(),
        ExpiryState {
            remaining_seconds: 60,
            phase: Phase::Active
        }
    );
    assert_eq!(context.displayed(), Some(credential.clone()));

    // Tick: Every second the remaining time drops by exactly one
    let mut ticks = context.subscribe().unwrap();
    for expected in (1..60).rev() {
        ticks.changed().await.unwrap();
        let state = *ticks.borrow_and_update();
        assert_eq!(state.remaining_seconds, expected);
        assert_eq!(state.phase, Phase::Active);
        assert_eq!(context.displayed(), Some(credential.clone()));
    }

    // Expire: The sixtieth tick withdraws the credential
    ticks.changed().await.unwrap();
    assert_eq!(ticks.borrow_and_update().phase, Phase::Expired);
    assert_eq!(context.status(), PresentationStatus::Expired);
    assert_eq!(context.displayed(), None);
    assert_eq!(context.last_issued(), Some(credential.clone()));

    // Expiry is local to the presenting side; the signature stays intact
    let verifier = Verifier::new(&config()).unwrap();
    assert!(verifier.verify(&credential.to_json().unwrap()).is_valid());

    context.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn urgency_follows_remaining_time() {
    let mut context = context();
    context.issue(&ada()).await.unwrap();
    assert_eq!(
        context.status(),
        PresentationStatus::Presenting {
            remaining_seconds: 60,
            urgency: Urgency::Calm
        }
    );

    tokio::time::sleep(Duration::from_millis(35_500)).await;
    assert_eq!(
        context.status(),
        PresentationStatus::Presenting {
            remaining_seconds: 25,
            urgency: Urgency::Warning
        }
    );

    tokio::time::sleep(Duration::from_secs(20)).await;
    assert_eq!(
        context.status(),
        PresentationStatus::Presenting {
            remaining_seconds: 5,
            urgency: Urgency::Critical
        }
    );
    assert_eq!(context.expiry_state().label(), "0:05");
}

#[tokio::test(start_paused = true)]
async fn reissue_cancels_previous_clock() {
    let mut context = context();
    let directory = directory();

    context.issue(&directory[0]).await.unwrap();
    let mut first = context.subscribe().unwrap();
    for _ in 0..5 {
        first.changed().await.unwrap();
    }
    assert_eq!(first.borrow_and_update().remaining_seconds, 55);

    // Reissue: A fresh clock starts at the full window
    let second = context.issue(&directory[1]).await.unwrap();
    assert_eq!(
        context.expiry_state(),
        ExpiryState {
            remaining_seconds: 60,
            phase: Phase::Active
        }
    );

    tokio::time::sleep(Duration::from_millis(10_500)).await;

    // The first clock never ticks again
    assert!(!matches!(first.has_changed(), Ok(true)));
    assert_eq!(first.borrow().remaining_seconds, 55);

    assert_eq!(context.expiry_state().remaining_seconds, 50);
    assert_eq!(context.displayed(), Some(second));
}

#[tokio::test(start_paused = true)]
async fn expiry_of_replaced_clock_does_not_clear_new_credential() {
    let issuer = Issuer::with_parts(&config(), InstantAttestation::default(), OsRng).unwrap();
    let mut context = PresentingContext::new(Arc::new(issuer), Duration::from_secs(2)).unwrap();

    context.issue(&ada()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    let second = context.issue(&ada()).await.unwrap();

    // The first window would have ended here
    tokio::time::sleep(Duration::from_millis(1_200)).await;
    assert_eq!(context.displayed(), Some(second));

    tokio::time::sleep(Duration::from_millis(1_000)).await;
    assert_eq!(context.displayed(), None);
    assert_eq!(context.status(), PresentationStatus::Expired);
}

#[tokio::test(start_paused = true)]
async fn sub_second_window_is_refused() {
    let issuer = Arc::new(
        Issuer::with_parts(&config(), InstantAttestation::default(), OsRng).unwrap(),
    );
    assert_eq!(
        PresentingContext::new(Arc::clone(&issuer), Duration::from_millis(500)).unwrap_err(),
        ConfigError::InvalidWindow
    );
    assert_eq!(
        PresentingContext::new(Arc::clone(&issuer), Duration::ZERO).unwrap_err(),
        ConfigError::InvalidWindow
    );

    // The shortest window still shows the credential until its first tick
    let mut context = PresentingContext::new(issuer, Duration::from_millis(1_500)).unwrap();
    let credential = context.issue(&ada()).await.unwrap();
    assert_eq!(
        context.status(),
        PresentationStatus::Presenting {
            remaining_seconds: 1,
            urgency: Urgency::Critical
        }
    );
    assert_eq!(context.displayed(), Some(credential));

    tokio::time::sleep(Duration::from_millis(1_100)).await;
    assert_eq!(context.status(), PresentationStatus::Expired);
    assert_eq!(context.displayed(), None);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_context_stops_the_clock() {
    let mut context = context();
    context.issue(&ada()).await.unwrap();
    let mut ticks = context.subscribe().unwrap();
    ticks.changed().await.unwrap();
    assert_eq!(ticks.borrow_and_update().remaining_seconds, 59);

    drop(context);
    tokio::time::sleep(Duration::from_secs(5)).await;

    // The clock task is gone, and with it the sending half
    assert!(ticks.has_changed().is_err());
    assert_eq!(ticks.borrow().remaining_seconds, 59);
}

#[tokio::test(start_paused = true)]
async fn teardown_withdraws_the_credential() {
    let mut context = context();
    context.issue(&ada()).await.unwrap();
    context.teardown();
    assert_eq!(context.displayed(), None);
    assert_eq!(context.status(), PresentationStatus::NotIssued);
    assert!(context.subscribe().is_none());
    assert!(context.last_issued().is_some());
}

#[tokio::test(start_paused = true)]
async fn failed_issuance_starts_no_clock() {
    let issuer = Issuer::with_parts(&config(), DenyList, OsRng).unwrap();
    let mut context = PresentingContext::new(Arc::new(issuer), WINDOW).unwrap();

    let first = context.issue(&ada()).await.unwrap();
    let refused = EmployeeRecord::new("x-1", "Nobody", "", "");
    assert_eq!(
        context.issue(&refused).await,
        Err(IssueCredentialError::IssuanceFailed(
            IssuanceFailure::Attestation
        ))
    );

    // The previous credential was withdrawn and no clock runs
    assert_eq!(context.status(), PresentationStatus::NotIssued);
    assert_eq!(context.displayed(), None);
    assert!(context.subscribe().is_none());
    assert_eq!(context.last_issued(), Some(first));

    // Retrying works
    assert!(context.issue(&ada()).await.is_ok());
    assert!(context.expiry_state().is_active());
}

#[tokio::test(start_paused = true)]
async fn unavailable_randomness_leaves_nothing_behind() {
    let issuer = Issuer::with_parts(&config(), InstantAttestation::default(), UnavailableEntropy)
        .unwrap();
    let mut context = PresentingContext::new(Arc::new(issuer), WINDOW).unwrap();
    assert_eq!(
        context.issue(&ada()).await,
        Err(IssueCredentialError::RandomnessUnavailable)
    );
    assert_eq!(context.status(), PresentationStatus::NotIssued);
    assert_eq!(context.last_issued(), None);
}

#[tokio::test(start_paused = true)]
async fn cancelled_clock_never_ticks() {
    let expired = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&expired);
    let mut clock = ExpiryClock::start(7, Duration::from_secs(3), move || {
        flag.store(true, Ordering::SeqCst);
    });
    let mut ticks = clock.subscribe();
    ticks.changed().await.unwrap();
    assert_eq!(clock.ticks(), 1);

    clock.cancel();
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(clock.ticks(), 1);
    assert_eq!(clock.state().remaining_seconds, 2);
    assert!(!expired.load(Ordering::SeqCst));
    assert!(!clock.is_running());
    assert!(clock.shutdown().await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn clock_runs_expiry_callback_once() {
    let expired = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&expired);
    let clock = ExpiryClock::start(1, Duration::from_secs(3), move || {
        assert!(!flag.swap(true, Ordering::SeqCst));
    });
    let mut ticks = clock.subscribe();
    while ticks.borrow_and_update().phase != Phase::Expired {
        ticks.changed().await.unwrap();
    }
    assert!(expired.load(Ordering::SeqCst));
    assert_eq!(clock.ticks(), 3);
    assert_eq!(clock.generation(), 1);
}

#[tokio::test(start_paused = true)]
async fn late_wakeup_collapses_missed_ticks() {
    let clock = ExpiryClock::start(1, WINDOW, || {});
    let mut ticks = clock.subscribe();

    // Stall the host for several seconds
    tokio::time::advance(Duration::from_millis(5_500)).await;
    ticks.changed().await.unwrap();

    assert_eq!(ticks.borrow_and_update().remaining_seconds, 55);
    assert_eq!(clock.ticks(), 1);
}
