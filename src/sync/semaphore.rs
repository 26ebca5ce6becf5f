// src/sync/semaphore.rs

//! Counting semaphore with strict FIFO hand-off.
//!
//! Permits start at `max_permits`. `acquire` takes a free permit without
//! suspending when one is available; otherwise the caller is queued and only
//! resumes when a later release hands it a permit **directly**. A direct
//! hand-off never touches the available counter, so the counter and the wait
//! queue are not both non-zero once a release has settled.
//!
//! Dropping a pending `acquire` future removes the waiter: if a permit had
//! already been handed to it, that permit is forwarded to the next waiter (or
//! returned to the pool). There is no other cancellation mechanism.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;
use tracing::{trace, warn};

/// Cheaply clonable handle; clones share the same permits and queue.
#[derive(Debug, Clone)]
pub struct Semaphore {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    max_permits: usize,
    state: Mutex<State>,
}

#[derive(Debug)]
struct State {
    available: usize,
    waiters: VecDeque<oneshot::Sender<()>>,
}

impl Semaphore {
    /// Create a semaphore with `max_permits` permits, all initially available.
    ///
    /// A semaphore with zero permits never grants one; callers that take a
    /// user-supplied capacity should validate it first.
    pub fn new(max_permits: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                max_permits,
                state: Mutex::new(State {
                    available: max_permits,
                    waiters: VecDeque::new(),
                }),
            }),
        }
    }

    pub fn max_permits(&self) -> usize {
        self.inner.max_permits
    }

    pub fn available_permits(&self) -> usize {
        self.lock().available
    }

    /// Number of acquirers currently queued.
    pub fn waiting(&self) -> usize {
        self.lock().waiters.len()
    }

    /// Take a permit if one is free right now.
    pub fn try_acquire(&self) -> Option<SemaphorePermit> {
        let mut state = self.lock();
        if state.available > 0 {
            state.available -= 1;
            Some(SemaphorePermit::new(self.clone()))
        } else {
            None
        }
    }

    /// Wait for a permit. Waiters are served strictly in arrival order.
    pub async fn acquire(&self) -> SemaphorePermit {
        loop {
            let rx = {
                let mut state = self.lock();
                if state.available > 0 {
                    state.available -= 1;
                    return SemaphorePermit::new(self.clone());
                }
                let (tx, rx) = oneshot::channel();
                state.waiters.push_back(tx);
                trace!(waiting = state.waiters.len(), "semaphore acquire queued");
                rx
            };

            let mut pending = PendingAcquire {
                semaphore: self,
                rx: Some(rx),
            };
            if pending.wait().await {
                return SemaphorePermit::new(self.clone());
            }
        }
    }

    /// Return one permit.
    ///
    /// Hands it to the oldest live waiter if there is one; otherwise the
    /// available counter goes up, clamped at `max_permits`. Prefer dropping a
    /// [`SemaphorePermit`]; this is for permits released via
    /// [`SemaphorePermit::forget`].
    pub fn release(&self) {
        let mut state = self.lock();
        while let Some(waiter) = state.waiters.pop_front() {
            if waiter.send(()).is_ok() {
                return;
            }
            // Receiver dropped before hand-off; try the next one.
        }

        if state.available < self.inner.max_permits {
            state.available += 1;
        } else {
            warn!(
                max_permits = self.inner.max_permits,
                "semaphore release without matching acquire; ignoring"
            );
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// A queued acquirer. Dropping it before the hand-off is observed gives a
/// granted-but-unclaimed permit back to the semaphore.
struct PendingAcquire<'a> {
    semaphore: &'a Semaphore,
    rx: Option<oneshot::Receiver<()>>,
}

impl PendingAcquire<'_> {
    /// `true` once the permit has been handed over.
    async fn wait(&mut self) -> bool {
        let Some(rx) = self.rx.as_mut() else {
            return false;
        };
        let granted = rx.await.is_ok();
        self.rx = None;
        granted
    }
}

impl Drop for PendingAcquire<'_> {
    fn drop(&mut self) {
        if let Some(mut rx) = self.rx.take() {
            rx.close();
            if rx.try_recv().is_ok() {
                self.semaphore.release();
            }
        }
    }
}

/// RAII permit; releases back to its semaphore when dropped, including on
/// early returns, errors and panics in the holder.
#[derive(Debug)]
#[must_use = "the permit is released as soon as it is dropped"]
pub struct SemaphorePermit {
    semaphore: Option<Semaphore>,
}

impl SemaphorePermit {
    fn new(semaphore: Semaphore) -> Self {
        Self {
            semaphore: Some(semaphore),
        }
    }

    /// Keep the permit checked out without a guard. The caller becomes
    /// responsible for a matching [`Semaphore::release`].
    pub fn forget(mut self) {
        self.semaphore = None;
    }
}

impl Drop for SemaphorePermit {
    fn drop(&mut self) {
        if let Some(semaphore) = self.semaphore.take() {
            semaphore.release();
        }
    }
}
