// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEntry {
    File(Vec<u8>),
    Dir,
}

/// In-memory filesystem for tests.
///
/// Paths are compared as given (no canonicalisation). The empty path, `.`
/// and `/` are implicit roots that always exist. Writes into a path
/// registered with [`MockFileSystem::fail_writes_to`] return an error, which
/// lets tests force a failure in the middle of a transaction.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    entries: Arc<Mutex<BTreeMap<PathBuf, MockEntry>>>,
    /// Path -> writes still allowed before injected failures start.
    failing: Arc<Mutex<BTreeMap<PathBuf, usize>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file, creating its parent directories.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = path.as_ref();
        let mut entries = self.entries();
        if let Some(parent) = real_parent(path) {
            insert_dirs(&mut entries, parent);
        }
        entries.insert(path.to_path_buf(), MockEntry::File(content.into()));
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        insert_dirs(&mut self.entries(), path.as_ref());
    }

    /// Make every subsequent write or copy targeting `path` fail.
    ///
    /// Renames still succeed, so a backup can be moved back into place.
    pub fn fail_writes_to(&self, path: impl AsRef<Path>) {
        self.fail_writes_to_after(path, 0);
    }

    /// Let `successes` writes or copies to `path` through, then fail the rest.
    pub fn fail_writes_to_after(&self, path: impl AsRef<Path>, successes: usize) {
        self.failing().insert(path.as_ref().to_path_buf(), successes);
    }

    /// Point-in-time copy of every entry, for before/after comparisons.
    pub fn snapshot(&self) -> BTreeMap<PathBuf, MockEntry> {
        self.entries().clone()
    }

    pub fn file_contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        match self.entries().get(path.as_ref()) {
            Some(MockEntry::File(content)) => Some(content.clone()),
            _ => None,
        }
    }

    fn entries(&self) -> MutexGuard<'_, BTreeMap<PathBuf, MockEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn failing(&self) -> MutexGuard<'_, BTreeMap<PathBuf, usize>> {
        self.failing.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_injected(&self, path: &Path) -> Result<()> {
        match self.failing().get_mut(path) {
            Some(0) => Err(anyhow!("injected write failure: {:?}", path)),
            Some(remaining) => {
                *remaining -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn check_writable(&self, entries: &BTreeMap<PathBuf, MockEntry>, path: &Path) -> Result<()> {
        if let Some(parent) = real_parent(path) {
            if !matches!(entries.get(parent), Some(MockEntry::Dir)) {
                return Err(anyhow!("parent directory not found: {:?}", parent));
            }
        }
        if matches!(entries.get(path), Some(MockEntry::Dir)) {
            return Err(anyhow!("Is a directory: {:?}", path));
        }
        Ok(())
    }
}

fn is_root(path: &Path) -> bool {
    path.as_os_str().is_empty() || path == Path::new(".") || path.parent().is_none()
}

/// Parent directory that must exist as an entry, or `None` for top-level paths.
fn real_parent(path: &Path) -> Option<&Path> {
    path.parent().filter(|p| !is_root(p))
}

fn insert_dirs(entries: &mut BTreeMap<PathBuf, MockEntry>, path: &Path) {
    if is_root(path) {
        return;
    }
    if let Some(parent) = real_parent(path) {
        insert_dirs(entries, parent);
    }
    entries
        .entry(path.to_path_buf())
        .or_insert(MockEntry::Dir);
}

impl FileSystem for MockFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        match self.entries().get(path) {
            Some(MockEntry::File(content)) => Ok(content.clone()),
            Some(MockEntry::Dir) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.check_injected(path)?;
        let mut entries = self.entries();
        self.check_writable(&entries, path)?;
        entries.insert(path.to_path_buf(), MockEntry::File(contents.to_vec()));
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        is_root(path) || self.entries().contains_key(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.entries().get(path), Some(MockEntry::File(_)))
    }

    fn is_dir(&self, path: &Path) -> bool {
        is_root(path) || matches!(self.entries().get(path), Some(MockEntry::Dir))
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        let mut entries = self.entries();
        let mut cursor = Some(path);
        while let Some(p) = cursor.filter(|p| !is_root(p)) {
            if matches!(entries.get(p), Some(MockEntry::File(_))) {
                return Err(anyhow!("Not a directory: {:?}", p));
            }
            cursor = p.parent();
        }
        insert_dirs(&mut entries, path);
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        let mut entries = self.entries();
        match entries.get(path) {
            Some(MockEntry::File(_)) => {
                entries.remove(path);
                Ok(())
            }
            Some(MockEntry::Dir) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        let mut entries = self.entries();
        if !matches!(entries.get(path), Some(MockEntry::Dir)) {
            return Err(anyhow!("Not a directory or not found: {:?}", path));
        }
        entries.retain(|p, _| !p.starts_with(path));
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let mut entries = self.entries();
        self.check_writable(&entries, to)?;
        let moved: Vec<PathBuf> = entries
            .keys()
            .filter(|p| p.starts_with(from))
            .cloned()
            .collect();
        if moved.is_empty() {
            return Err(anyhow!("File not found: {:?}", from));
        }
        for old in moved {
            if let Some(entry) = entries.remove(&old) {
                let suffix = old.strip_prefix(from).unwrap_or(Path::new(""));
                let new = if suffix.as_os_str().is_empty() {
                    to.to_path_buf()
                } else {
                    to.join(suffix)
                };
                entries.insert(new, entry);
            }
        }
        Ok(())
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        self.check_injected(to)?;
        let mut entries = self.entries();
        let content = match entries.get(from) {
            Some(MockEntry::File(content)) => content.clone(),
            Some(MockEntry::Dir) => return Err(anyhow!("Is a directory: {:?}", from)),
            None => return Err(anyhow!("File not found: {:?}", from)),
        };
        self.check_writable(&entries, to)?;
        entries.insert(to.to_path_buf(), MockEntry::File(content));
        Ok(())
    }
}
