use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use opguard::combinators::{measure_time, measure_time_with, with_timeout};
use opguard::errors::OpguardError;
use opguard_test_utils::init_tracing;

#[tokio::test(start_paused = true)]
async fn completes_within_deadline() {
    let value = with_timeout(Duration::from_secs(1), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        7
    })
    .await
    .unwrap();
    assert_eq!(value, 7);
}

#[tokio::test(start_paused = true)]
async fn times_out_with_configured_duration() {
    init_tracing();

    let finished = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&finished);

    let err = with_timeout(Duration::from_millis(50), async move {
        tokio::time::sleep(Duration::from_secs(10)).await;
        flag.store(true, Ordering::SeqCst);
    })
    .await
    .unwrap_err();

    assert!(matches!(err, OpguardError::Timeout(d) if d == Duration::from_millis(50)));
    assert_eq!(err.to_string(), "Operation timed out after 50ms");
    assert!(!finished.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn inner_error_is_returned_untouched() {
    let res: Result<Result<(), &str>, OpguardError> =
        with_timeout(Duration::from_secs(1), async { Err("inner") }).await;
    assert_eq!(res.unwrap(), Err("inner"));
}

#[tokio::test(start_paused = true)]
async fn measure_reports_elapsed_time() {
    let (value, elapsed) = measure_time(async {
        tokio::time::sleep(Duration::from_millis(250)).await;
        "done"
    })
    .await;
    assert_eq!(value, "done");
    assert_eq!(elapsed.as_millis(), 250);

    let mut reported = None;
    let value = measure_time_with(
        async {
            tokio::time::sleep(Duration::from_millis(40)).await;
            1
        },
        |elapsed| reported = Some(elapsed),
    )
    .await;
    assert_eq!(value, 1);
    assert_eq!(reported.map(|d| d.as_millis()), Some(40));
}
