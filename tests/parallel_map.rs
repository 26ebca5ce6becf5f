use std::time::Duration;

use anyhow::anyhow;
use opguard::combinators::parallel_map;
use opguard::errors::OpguardError;
use opguard_test_utils::init_tracing;
use opguard_test_utils::probes::ConcurrencyProbe;

#[tokio::test(start_paused = true)]
async fn preserves_input_order_despite_completion_order() {
    init_tracing();

    // Earlier items take longer, so they finish last.
    let items = vec![("a", 30u64), ("b", 20), ("c", 10)];
    let out = parallel_map(items, 3, |(name, delay)| async move {
        tokio::time::sleep(Duration::from_millis(delay)).await;
        Ok(name.to_uppercase())
    })
    .await
    .unwrap();

    assert_eq!(out, vec!["A", "B", "C"]);
}

#[tokio::test(start_paused = true)]
async fn concurrency_one_runs_sequentially_in_order() {
    let probe = ConcurrencyProbe::new();
    let p = probe.clone();

    let out = parallel_map(vec![1, 2, 3], 1, move |n| {
        let p = p.clone();
        async move {
            p.run_for(Duration::from_millis(5)).await;
            Ok(n * 10)
        }
    })
    .await
    .unwrap();

    assert_eq!(out, vec![10, 20, 30]);
    assert_eq!(probe.max_observed(), 1);
}

#[tokio::test(start_paused = true)]
async fn never_exceeds_concurrency_limit() {
    let probe = ConcurrencyProbe::new();
    let p = probe.clone();

    let items: Vec<u32> = (0..20).collect();
    let out = parallel_map(items, 4, move |n| {
        let p = p.clone();
        async move {
            p.run_for(Duration::from_millis(10)).await;
            Ok(n)
        }
    })
    .await
    .unwrap();

    assert_eq!(out, (0..20).collect::<Vec<_>>());
    assert_eq!(probe.max_observed(), 4);
}

#[tokio::test(start_paused = true)]
async fn limit_above_length_runs_everything_at_once() {
    let probe = ConcurrencyProbe::new();
    let p = probe.clone();

    parallel_map(vec![(); 3], 10, move |_| {
        let p = p.clone();
        async move {
            p.run_for(Duration::from_millis(10)).await;
            Ok(())
        }
    })
    .await
    .unwrap();

    assert_eq!(probe.max_observed(), 3);
}

#[tokio::test]
async fn collects_every_failure_after_all_tasks_settle() {
    init_tracing();

    let err = parallel_map(vec![0, 1, 2, 3, 4], 2, |n| async move {
        if n % 2 == 1 {
            Err(anyhow!("item {n} failed"))
        } else {
            Ok(n)
        }
    })
    .await
    .unwrap_err();

    match err {
        OpguardError::Parallel { total, failures } => {
            assert_eq!(total, 5);
            let indices: Vec<usize> = failures.iter().map(|f| f.index).collect();
            assert_eq!(indices, vec![1, 3]);
            assert_eq!(failures[0].error.to_string(), "item 1 failed");
        }
        other => panic!("expected Parallel error, got {other:?}"),
    }
}

#[tokio::test]
async fn failed_task_releases_its_permit() {
    // With one permit, a failure that leaked the permit would hang the rest.
    let err = parallel_map(vec![true, false, false], 1, |fail| async move {
        if fail {
            Err(anyhow!("boom"))
        } else {
            Ok(())
        }
    });
    let err = opguard_test_utils::with_timeout(err).await.unwrap_err();
    assert!(matches!(err, OpguardError::Parallel { ref failures, .. } if failures.len() == 1));
}

#[tokio::test]
async fn panicking_task_is_reported_as_failure() {
    let err = parallel_map(vec![0, 1], 2, |n| async move {
        if n == 1 {
            panic!("task {n} exploded");
        }
        Ok(n)
    })
    .await
    .unwrap_err();

    match err {
        OpguardError::Parallel { failures, .. } => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].index, 1);
        }
        other => panic!("expected Parallel error, got {other:?}"),
    }
}

#[tokio::test]
async fn zero_concurrency_is_rejected() {
    let err = parallel_map(vec![1], 0, |n| async move { Ok(n) })
        .await
        .unwrap_err();
    assert!(matches!(err, OpguardError::Validation(_)));
}

#[tokio::test]
async fn empty_input_yields_empty_output() {
    let out: Vec<u8> = parallel_map(Vec::<u8>::new(), 2, |n| async move { Ok(n) })
        .await
        .unwrap();
    assert!(out.is_empty());
}
