// src/transaction/fs_ops.rs

//! Filesystem operations with backup/restore compensation.
//!
//! | factory              | execute                                   | rollback                                 |
//! |----------------------|-------------------------------------------|------------------------------------------|
//! | [`write_file`]       | back up existing file, create parents, write | restore backup, or remove the new file |
//! | [`create_directory`] | create recursively if absent              | remove what this op created              |
//! | [`delete_file`]      | move the file aside to a backup           | move it back                             |
//! | [`copy_file`]        | back up destination, create parents, copy | restore backup, or remove the copy       |
//!
//! Backups are sibling files named by [`StepContext::backup_path`] and are
//! removed when the owning transaction commits. An execute step that fails
//! part-way undoes its own partial effects before returning the error, since
//! a failed step is not compensated by the transaction.
//!
//! File I/O runs on Tokio's blocking pool, so a commit deadline can interrupt
//! a slow step. Rollback still compensates an interrupted step: compensation
//! waits for the in-flight I/O to finish and then undoes what it recorded.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{anyhow, bail, Result};
use tracing::{debug, warn};

use crate::errors::OpguardError;
use crate::fs::FileSystem;

use super::context::StepContext;
use super::operation::{Operation, Step, StepFuture};

pub fn write_file(path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) -> Operation {
    let path = path.into();
    let content = content.into();
    let description = format!("write {} bytes to {}", content.len(), path.display());
    Operation::new(
        description,
        WriteFile {
            content: Arc::new(content),
            target: Guarded::new(Replacement::new(path)),
        },
    )
}

pub fn create_directory(path: impl Into<PathBuf>) -> Operation {
    let path = path.into();
    let description = format!("create directory {}", path.display());
    Operation::new(
        description,
        CreateDirectory {
            state: Guarded::new(DirState {
                path,
                created_root: None,
            }),
        },
    )
}

pub fn delete_file(path: impl Into<PathBuf>) -> Operation {
    let path = path.into();
    let description = format!("delete {}", path.display());
    Operation::new(
        description,
        DeleteFile {
            state: Guarded::new(DeleteState { path, backup: None }),
        },
    )
}

pub fn copy_file(from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> Operation {
    let from = from.into();
    let to = to.into();
    let description = format!("copy {} to {}", from.display(), to.display());
    Operation::new(
        description,
        CopyFile {
            from: Arc::new(from),
            target: Guarded::new(Replacement::new(to)),
        },
    )
}

/// Topmost ancestor of `path` (inclusive) that does not exist yet.
fn topmost_missing(fs: &dyn FileSystem, path: &Path) -> Option<PathBuf> {
    let mut missing = None;
    let mut cursor = Some(path);
    while let Some(p) = cursor {
        if p.as_os_str().is_empty() || fs.exists(p) {
            break;
        }
        missing = Some(p.to_path_buf());
        cursor = p.parent();
    }
    missing
}

fn resource_state(msg: String) -> anyhow::Error {
    OpguardError::ResourceState(msg).into()
}

#[derive(Debug)]
struct Tracked<S> {
    state: S,
    /// Set once compensation has started; a late execute must not run.
    rolled_back: bool,
}

/// Rollback state shared with the blocking-pool task doing the I/O.
///
/// The lock is held for the whole of each blocking call. A compensation
/// queued behind an abandoned execute therefore waits for it, then sees
/// exactly what it recorded.
#[derive(Debug)]
struct Guarded<S> {
    inner: Arc<Mutex<Tracked<S>>>,
}

impl<S: Send + 'static> Guarded<S> {
    fn new(state: S) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Tracked {
                state,
                rolled_back: false,
            })),
        }
    }

    async fn execute<F>(&self, cx: &StepContext, work: F) -> Result<()>
    where
        F: FnOnce(&StepContext, &mut S) -> Result<()> + Send + 'static,
    {
        self.blocking(cx, move |cx, tracked| {
            if tracked.rolled_back {
                bail!("operation was rolled back before its file work started");
            }
            work(cx, &mut tracked.state)
        })
        .await
    }

    async fn compensate<F>(&self, cx: &StepContext, undo: F) -> Result<()>
    where
        F: FnOnce(&StepContext, &mut S) -> Result<()> + Send + 'static,
    {
        self.blocking(cx, move |cx, tracked| {
            tracked.rolled_back = true;
            undo(cx, &mut tracked.state)
        })
        .await
    }

    fn finalize<F>(&self, cx: &StepContext, cleanup: F) -> Result<()>
    where
        F: FnOnce(&StepContext, &mut S) -> Result<()>,
    {
        cleanup(cx, &mut self.lock().state)
    }

    async fn blocking<F>(&self, cx: &StepContext, f: F) -> Result<()>
    where
        F: FnOnce(&StepContext, &mut Tracked<S>) -> Result<()> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let cx = cx.clone();
        tokio::task::spawn_blocking(move || {
            let mut tracked = inner.lock().unwrap_or_else(PoisonError::into_inner);
            f(&cx, &mut *tracked)
        })
        .await
        .map_err(|err| anyhow!("file task did not complete: {err}"))?
    }

    fn lock(&self) -> MutexGuard<'_, Tracked<S>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Rollback state for an operation that (over)writes a single file.
#[derive(Debug)]
struct Replacement {
    path: PathBuf,
    backup: Option<PathBuf>,
    created_file: bool,
    created_dir: Option<PathBuf>,
}

impl Replacement {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            backup: None,
            created_file: false,
            created_dir: None,
        }
    }

    /// Back up the current file, or create missing parents.
    fn prepare(&mut self, cx: &StepContext) -> Result<()> {
        let fs = cx.fs();
        if fs.is_dir(&self.path) {
            return Err(resource_state(format!(
                "{} is a directory",
                self.path.display()
            )));
        }

        if fs.is_file(&self.path) {
            let backup = cx.backup_path(&self.path);
            fs.copy(&self.path, &backup)?;
            debug!(path = %self.path.display(), backup = %backup.display(), "backed up existing file");
            self.backup = Some(backup);
        } else {
            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                self.created_dir = topmost_missing(fs, parent);
                if self.created_dir.is_some() {
                    fs.create_dir_all(parent)?;
                }
            }
            self.created_file = true;
        }
        Ok(())
    }

    /// Run the write itself; on failure restore what `prepare` changed.
    fn replace_with<F>(&mut self, cx: &StepContext, write: F) -> Result<()>
    where
        F: FnOnce(&dyn FileSystem, &Path) -> Result<()>,
    {
        let result = self
            .prepare(cx)
            .and_then(|()| write(cx.fs(), &self.path));
        if let Err(err) = result {
            if let Err(undo_err) = self.undo(cx.fs()) {
                warn!(
                    path = %self.path.display(),
                    error = %undo_err,
                    "failed to undo partial write"
                );
            }
            return Err(err);
        }
        Ok(())
    }

    fn undo(&mut self, fs: &dyn FileSystem) -> Result<()> {
        if let Some(backup) = &self.backup {
            fs.rename(backup, &self.path)?;
            self.backup = None;
        } else if self.created_file && fs.is_file(&self.path) {
            fs.remove_file(&self.path)?;
        }
        self.created_file = false;

        if let Some(dir) = &self.created_dir {
            if fs.is_dir(dir) {
                fs.remove_dir_all(dir)?;
            }
            self.created_dir = None;
        }
        Ok(())
    }

    fn discard_backup(&mut self, fs: &dyn FileSystem) -> Result<()> {
        if let Some(backup) = self.backup.take() {
            fs.remove_file(&backup)?;
        }
        Ok(())
    }
}

#[derive(Debug)]
struct WriteFile {
    content: Arc<Vec<u8>>,
    target: Guarded<Replacement>,
}

impl Step for WriteFile {
    fn execute<'a>(&'a mut self, cx: &'a StepContext) -> StepFuture<'a> {
        let content = Arc::clone(&self.content);
        Box::pin(self.target.execute(cx, move |cx, target| {
            target.replace_with(cx, |fs, path| fs.write(path, &content))
        }))
    }

    fn has_compensator(&self) -> bool {
        true
    }

    fn compensates_interrupted(&self) -> bool {
        true
    }

    fn compensate<'a>(&'a mut self, cx: &'a StepContext) -> StepFuture<'a> {
        Box::pin(
            self.target
                .compensate(cx, |cx, target| target.undo(cx.fs())),
        )
    }

    fn finalize(&mut self, cx: &StepContext) -> Result<()> {
        self.target
            .finalize(cx, |cx, target| target.discard_backup(cx.fs()))
    }
}

#[derive(Debug)]
struct CopyFile {
    from: Arc<PathBuf>,
    target: Guarded<Replacement>,
}

impl Step for CopyFile {
    fn execute<'a>(&'a mut self, cx: &'a StepContext) -> StepFuture<'a> {
        let from = Arc::clone(&self.from);
        Box::pin(self.target.execute(cx, move |cx, target| {
            if !cx.fs().is_file(&from) {
                return Err(resource_state(format!(
                    "copy source {} does not exist",
                    from.display()
                )));
            }
            target.replace_with(cx, |fs, path| fs.copy(&from, path))
        }))
    }

    fn has_compensator(&self) -> bool {
        true
    }

    fn compensates_interrupted(&self) -> bool {
        true
    }

    fn compensate<'a>(&'a mut self, cx: &'a StepContext) -> StepFuture<'a> {
        Box::pin(
            self.target
                .compensate(cx, |cx, target| target.undo(cx.fs())),
        )
    }

    fn finalize(&mut self, cx: &StepContext) -> Result<()> {
        self.target
            .finalize(cx, |cx, target| target.discard_backup(cx.fs()))
    }
}

#[derive(Debug)]
struct DirState {
    path: PathBuf,
    /// Topmost directory this operation created; `None` if it pre-existed.
    created_root: Option<PathBuf>,
}

#[derive(Debug)]
struct CreateDirectory {
    state: Guarded<DirState>,
}

impl Step for CreateDirectory {
    fn execute<'a>(&'a mut self, cx: &'a StepContext) -> StepFuture<'a> {
        Box::pin(self.state.execute(cx, |cx, dir| {
            let fs = cx.fs();
            if fs.is_dir(&dir.path) {
                debug!(path = %dir.path.display(), "directory already exists");
                return Ok(());
            }
            if fs.exists(&dir.path) {
                return Err(resource_state(format!(
                    "{} exists and is not a directory",
                    dir.path.display()
                )));
            }

            let root = topmost_missing(fs, &dir.path);
            fs.create_dir_all(&dir.path)?;
            dir.created_root = root;
            Ok(())
        }))
    }

    fn has_compensator(&self) -> bool {
        true
    }

    fn compensates_interrupted(&self) -> bool {
        true
    }

    fn compensate<'a>(&'a mut self, cx: &'a StepContext) -> StepFuture<'a> {
        Box::pin(self.state.compensate(cx, |cx, dir| {
            if let Some(root) = &dir.created_root {
                let fs = cx.fs();
                if fs.is_dir(root) {
                    fs.remove_dir_all(root)?;
                }
                dir.created_root = None;
            }
            Ok(())
        }))
    }
}

#[derive(Debug)]
struct DeleteState {
    path: PathBuf,
    backup: Option<PathBuf>,
}

#[derive(Debug)]
struct DeleteFile {
    state: Guarded<DeleteState>,
}

impl Step for DeleteFile {
    fn execute<'a>(&'a mut self, cx: &'a StepContext) -> StepFuture<'a> {
        Box::pin(self.state.execute(cx, |cx, target| {
            let fs = cx.fs();
            if fs.is_dir(&target.path) {
                return Err(resource_state(format!(
                    "{} is a directory; only files can be deleted",
                    target.path.display()
                )));
            }
            if !fs.exists(&target.path) {
                debug!(path = %target.path.display(), "nothing to delete");
                return Ok(());
            }

            let backup = cx.backup_path(&target.path);
            fs.rename(&target.path, &backup)?;
            target.backup = Some(backup);
            Ok(())
        }))
    }

    fn has_compensator(&self) -> bool {
        true
    }

    fn compensates_interrupted(&self) -> bool {
        true
    }

    fn compensate<'a>(&'a mut self, cx: &'a StepContext) -> StepFuture<'a> {
        Box::pin(self.state.compensate(cx, |cx, target| {
            if let Some(backup) = &target.backup {
                cx.fs().rename(backup, &target.path)?;
                target.backup = None;
            }
            Ok(())
        }))
    }

    fn finalize(&mut self, cx: &StepContext) -> Result<()> {
        self.state.finalize(cx, |cx, target| {
            if let Some(backup) = target.backup.take() {
                cx.fs().remove_file(&backup)?;
            }
            Ok(())
        })
    }
}
