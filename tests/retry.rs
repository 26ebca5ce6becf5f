use std::sync::{Arc, Mutex};
use std::time::Duration;

use opguard::combinators::{retry, retry_with, RetryPolicy};
use opguard::errors::OpguardError;
use opguard_test_utils::init_tracing;
use opguard_test_utils::probes::Flaky;
use proptest::prelude::*;
use tokio::time::Instant;

fn policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy::new(max_retries, Duration::from_millis(100), Duration::from_millis(350))
}

#[tokio::test(start_paused = true)]
async fn succeeds_after_transient_failures() {
    init_tracing();

    let flaky = Flaky::new(2);
    let retries = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&retries);

    let value = retry_with(
        &policy(3),
        || flaky.call(),
        move |attempt, err: &anyhow::Error| seen.lock().unwrap().push((attempt, err.to_string())),
    )
    .await
    .expect("third call succeeds");

    assert_eq!(value, 3);
    assert_eq!(flaky.calls(), 3);
    assert_eq!(
        *retries.lock().unwrap(),
        vec![
            (1, "flaky failure #1".to_string()),
            (2, "flaky failure #2".to_string()),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn never_failing_operation_runs_once() {
    let flaky = Flaky::new(0);
    let value = retry(&policy(5), || flaky.call()).await.unwrap();
    assert_eq!(value, 1);
    assert_eq!(flaky.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn exhausts_after_max_retries() {
    init_tracing();

    let flaky = Flaky::new(usize::MAX);
    let mut callbacks = 0;

    let err = retry_with(&policy(3), || flaky.call(), |_, _| callbacks += 1)
        .await
        .unwrap_err();

    assert_eq!(callbacks, 3);
    assert_eq!(flaky.calls(), 4);
    match err {
        OpguardError::RetryExhausted { attempts, source } => {
            assert_eq!(attempts, 4);
            assert_eq!(source.to_string(), "flaky failure #4");
        }
        other => panic!("expected RetryExhausted, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn zero_retries_fails_on_first_error() {
    let flaky = Flaky::new(1);
    let err = retry(&policy(0), || flaky.call()).await.unwrap_err();
    assert!(matches!(err, OpguardError::RetryExhausted { attempts: 1, .. }));
    assert_eq!(flaky.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn sleeps_follow_capped_exponential_backoff() {
    let flaky = Flaky::new(4);
    let started = Instant::now();
    let stamps = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&stamps);

    retry_with(
        &policy(4),
        || {
            recorder.lock().unwrap().push(started.elapsed());
            flaky.call()
        },
        |_, _| {},
    )
    .await
    .unwrap();

    let stamps = stamps.lock().unwrap().clone();
    let gaps: Vec<u128> = stamps
        .windows(2)
        .map(|w| (w[1] - w[0]).as_millis())
        .collect();
    assert_eq!(gaps, vec![100, 200, 350, 350]);
}

#[test]
fn delay_for_huge_attempt_saturates_at_max() {
    let p = policy(100);
    assert_eq!(p.delay_for_attempt(64), Duration::from_millis(350));
    assert_eq!(p.delay_for_attempt(u32::MAX), Duration::from_millis(350));
}

proptest! {
    #[test]
    fn delay_matches_formula(
        initial_ms in 1u64..1_000,
        max_ms in 1u64..100_000,
        attempt in 1u32..20,
    ) {
        let p = RetryPolicy::new(10, Duration::from_millis(initial_ms), Duration::from_millis(max_ms));
        let expected = (initial_ms * (1u64 << (attempt - 1))).min(max_ms);
        prop_assert_eq!(p.delay_for_attempt(attempt), Duration::from_millis(expected));
    }
}
