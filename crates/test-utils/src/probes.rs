use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use opguard::fs::FileSystem;
use opguard::fs::mock::MockFileSystem;
use opguard::transaction::Operation;

/// Shared, ordered record of what test operations did.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<String>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

/// Operation that logs `execute:<name>` and, on rollback, `compensate:<name>`.
pub fn recorded_operation(name: &str, log: &EventLog) -> Operation {
    let exec_name = name.to_string();
    let exec_log = log.clone();
    let comp_name = name.to_string();
    let comp_log = log.clone();

    Operation::compensated(
        format!("record {name}"),
        move || {
            let log = exec_log.clone();
            let name = exec_name.clone();
            async move {
                log.push(format!("execute:{name}"));
                Ok(())
            }
        },
        move || {
            let log = comp_log.clone();
            let name = comp_name.clone();
            async move {
                log.push(format!("compensate:{name}"));
                Ok(())
            }
        },
    )
}

/// Operation whose executor logs `execute:<name>` and then fails.
pub fn failing_operation(name: &str, log: &EventLog) -> Operation {
    let exec_name = name.to_string();
    let exec_log = log.clone();
    let comp_name = name.to_string();
    let comp_log = log.clone();

    Operation::compensated(
        format!("fail {name}"),
        move || {
            let log = exec_log.clone();
            let name = exec_name.clone();
            async move {
                log.push(format!("execute:{name}"));
                Err(anyhow!("{name} failed on purpose"))
            }
        },
        move || {
            let log = comp_log.clone();
            let name = comp_name.clone();
            async move {
                log.push(format!("compensate:{name}"));
                Ok(())
            }
        },
    )
}

/// Operation that succeeds but whose compensator fails.
pub fn broken_compensator_operation(name: &str, log: &EventLog) -> Operation {
    let exec_name = name.to_string();
    let exec_log = log.clone();
    let comp_name = name.to_string();
    let comp_log = log.clone();

    Operation::compensated(
        format!("broken undo {name}"),
        move || {
            let log = exec_log.clone();
            let name = exec_name.clone();
            async move {
                log.push(format!("execute:{name}"));
                Ok(())
            }
        },
        move || {
            let log = comp_log.clone();
            let name = comp_name.clone();
            async move {
                log.push(format!("compensate:{name}"));
                Err(anyhow!("cannot undo {name}"))
            }
        },
    )
}

/// Counts calls and fails the first `failures` of them.
#[derive(Debug, Clone)]
pub struct Flaky {
    failures: usize,
    calls: Arc<AtomicUsize>,
}

impl Flaky {
    pub fn new(failures: usize) -> Self {
        Self {
            failures,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Returns `Ok(call_number)` once the configured failures are used up.
    pub async fn call(&self) -> anyhow::Result<usize> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.failures {
            Err(anyhow!("flaky failure #{call}"))
        } else {
            Ok(call)
        }
    }
}

/// Tracks how many probed sections are running at once.
#[derive(Debug, Clone, Default)]
pub struct ConcurrencyProbe {
    current: Arc<AtomicUsize>,
    max: Arc<AtomicUsize>,
}

impl ConcurrencyProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_observed(&self) -> usize {
        self.max.load(Ordering::SeqCst)
    }

    /// Hold a slot for `hold`, recording the peak concurrency.
    pub async fn run_for(&self, hold: Duration) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(hold).await;
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Operation that sleeps for `hold` without compensation.
pub fn stalled_operation(name: &str, hold: Duration) -> Operation {
    Operation::from_fn(format!("stall {name}"), move || async move {
        tokio::time::sleep(hold).await;
        Ok(())
    })
}

/// `MockFileSystem` whose writes block the calling thread for `delay`.
#[derive(Debug, Clone)]
pub struct SlowFileSystem {
    inner: MockFileSystem,
    delay: Duration,
}

impl SlowFileSystem {
    pub fn new(inner: MockFileSystem, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

impl FileSystem for SlowFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.inner.read(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        std::thread::sleep(self.delay);
        self.inner.write(path, contents)
    }

    fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.inner.is_file(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.inner.is_dir(path)
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        self.inner.create_dir_all(path)
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        self.inner.remove_file(path)
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        self.inner.remove_dir_all(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        self.inner.rename(from, to)
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        self.inner.copy(from, to)
    }
}
