use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::anyhow;
use opguard::simulation::{Gated, SimulationMode, DRY_RUN_ENV};
use opguard_test_utils::init_tracing;

#[tokio::test]
async fn gate_runs_operation_when_disabled() {
    let mode = SimulationMode::new(false);
    let result: anyhow::Result<Gated<u32>> = mode.gate("compute", || async { Ok(41 + 1) }).await;
    assert_eq!(result.unwrap(), Gated::Executed(42));
}

#[tokio::test]
async fn gate_skips_operation_when_enabled() {
    init_tracing();

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let mode = SimulationMode::new(true);

    let result: anyhow::Result<Gated<u32>> = mode
        .gate("compute", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(1)
        })
        .await;

    assert!(result.unwrap().is_simulated());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn gate_passes_errors_through_unchanged() {
    let mode = SimulationMode::new(false);
    let result: anyhow::Result<Gated<()>> =
        mode.gate("explode", || async { Err(anyhow!("kaboom")) }).await;
    assert_eq!(result.unwrap_err().to_string(), "kaboom");
}

#[tokio::test]
async fn gate_void_runs_or_skips() {
    let calls = Arc::new(AtomicUsize::new(0));

    for enabled in [false, true] {
        let counter = Arc::clone(&calls);
        let mode = SimulationMode::new(enabled);
        mode.gate_void::<anyhow::Error, _, _>("bump", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .await
        .unwrap();
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn sync_gates_mirror_async_ones() {
    let mode = SimulationMode::new(false);
    let value: Result<Gated<&str>, String> = mode.gate_sync("read", || Ok("data"));
    assert_eq!(value.unwrap().executed(), Some("data"));

    let failed: Result<(), String> = mode.gate_sync_void("fail", || Err("nope".to_string()));
    assert_eq!(failed.unwrap_err(), "nope");

    mode.enable();
    let skipped: Result<Gated<&str>, String> =
        mode.gate_sync("read", || panic!("must not run while simulating"));
    assert_eq!(skipped.unwrap(), Gated::Simulated);

    let skipped: Result<(), String> =
        mode.gate_sync_void("fail", || panic!("must not run while simulating"));
    assert!(skipped.is_ok());
}

#[test]
fn clones_share_the_same_switch() {
    let mode = SimulationMode::default();
    let clone = mode.clone();
    assert!(!clone.is_enabled());

    mode.enable();
    assert!(clone.is_enabled());

    clone.disable();
    assert!(!mode.is_enabled());
}

#[test]
fn toggling_affects_the_next_gated_call() {
    let mode = SimulationMode::new(true);
    let first: Result<Gated<i32>, ()> = mode.gate_sync("first", || Ok(1));
    mode.disable();
    let second: Result<Gated<i32>, ()> = mode.gate_sync("second", || Ok(2));

    assert_eq!(first, Ok(Gated::Simulated));
    assert_eq!(second, Ok(Gated::Executed(2)));
}

#[test]
fn from_env_reads_dry_run_flag() {
    // Only this test touches the variable.
    unsafe { std::env::set_var(DRY_RUN_ENV, "true") };
    assert!(SimulationMode::from_env().is_enabled());

    unsafe { std::env::set_var(DRY_RUN_ENV, "ON") };
    assert!(SimulationMode::from_env().is_enabled());

    unsafe { std::env::set_var(DRY_RUN_ENV, "0") };
    assert!(!SimulationMode::from_env().is_enabled());

    unsafe { std::env::remove_var(DRY_RUN_ENV) };
    assert!(!SimulationMode::from_env().is_enabled());
}
