use std::time::Duration;

use opguard::sync::Semaphore;
use opguard_test_utils::{init_tracing, with_timeout};
use tokio::sync::mpsc;

#[tokio::test]
async fn acquires_up_to_capacity_without_waiting() {
    init_tracing();

    let sem = Semaphore::new(3);
    let a = sem.try_acquire().expect("first permit");
    let b = sem.try_acquire().expect("second permit");
    let c = sem.acquire().await;
    assert_eq!(sem.available_permits(), 0);
    assert!(sem.try_acquire().is_none());

    drop((a, b, c));
    assert_eq!(sem.available_permits(), 3);
}

#[tokio::test]
async fn extra_acquirer_waits_for_release() {
    init_tracing();

    let sem = Semaphore::new(1);
    let held = sem.acquire().await;

    let contender = {
        let sem = sem.clone();
        tokio::spawn(async move {
            let _permit = sem.acquire().await;
        })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!contender.is_finished());
    assert_eq!(sem.waiting(), 1);

    drop(held);
    with_timeout(contender).await.unwrap();
    assert_eq!(sem.available_permits(), 1);
}

#[tokio::test]
async fn release_hands_permit_to_oldest_waiter_first() {
    init_tracing();

    let sem = Semaphore::new(1);
    let held = sem.acquire().await;
    let (tx, mut rx) = mpsc::unbounded_channel();

    for id in 0..4 {
        let sem_clone = sem.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let permit = sem_clone.acquire().await;
            tx.send(id).unwrap();
            tokio::time::sleep(Duration::from_millis(5)).await;
            drop(permit);
        });
        // Let each waiter enqueue before spawning the next.
        while sem.waiting() < id + 1 {
            tokio::task::yield_now().await;
        }
    }
    drop(tx);

    drop(held);

    let mut order = Vec::new();
    while let Some(id) = with_timeout(rx.recv()).await {
        order.push(id);
    }
    assert_eq!(order, vec![0, 1, 2, 3]);
    assert_eq!(sem.available_permits(), 1);
}

#[tokio::test]
async fn direct_handoff_bypasses_counter() {
    init_tracing();

    let sem = Semaphore::new(1);
    let held = sem.acquire().await;

    let waiter = {
        let sem = sem.clone();
        tokio::spawn(async move { sem.acquire().await })
    };
    while sem.waiting() == 0 {
        tokio::task::yield_now().await;
    }

    drop(held);
    // Permit went straight to the waiter; the counter never went up.
    assert_eq!(sem.available_permits(), 0);
    assert_eq!(sem.waiting(), 0);

    let permit = with_timeout(waiter).await.unwrap();
    drop(permit);
    assert_eq!(sem.available_permits(), 1);
}

#[tokio::test]
async fn unmatched_release_is_clamped() {
    init_tracing();

    let sem = Semaphore::new(2);
    sem.release();
    sem.release();
    assert_eq!(sem.available_permits(), 2);
}

#[tokio::test]
async fn forgotten_permit_is_returned_by_manual_release() {
    let sem = Semaphore::new(1);
    sem.acquire().await.forget();
    assert_eq!(sem.available_permits(), 0);

    sem.release();
    assert_eq!(sem.available_permits(), 1);
}

#[tokio::test]
async fn dropped_waiter_does_not_leak_permit() {
    init_tracing();

    let sem = Semaphore::new(1);
    let held = sem.acquire().await;

    let abandoned = {
        let sem = sem.clone();
        tokio::spawn(async move {
            let _permit = sem.acquire().await;
        })
    };
    while sem.waiting() == 0 {
        tokio::task::yield_now().await;
    }
    abandoned.abort();
    let _ = abandoned.await;

    drop(held);
    assert_eq!(sem.available_permits(), 1);
    assert!(sem.try_acquire().is_some());
}
