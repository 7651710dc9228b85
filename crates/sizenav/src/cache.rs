//! Process-wide memo of directory size labels.
//!
//! Entries are written once per path and never refreshed on their own: a
//! directory whose contents change after it was measured keeps its old label
//! until [`SizeCache::clear`] is called.
//!
//! Concurrent first visits to the same path are not serialized. The lock is
//! released while `compute` runs, so two loads racing on an unseen directory
//! may both measure it; the label stored first is the one every caller gets.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

#[derive(Debug, Default)]
pub struct SizeCache {
    labels: Mutex<HashMap<PathBuf, String>>,
}

impl SizeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &Path) -> Option<String> {
        self.lock().get(path).cloned()
    }

    /// Return the cached label for `path`, computing and storing it on a miss.
    ///
    /// `compute` must fold failures into the label it returns; error labels
    /// are cached like any other so the path is not measured again.
    pub fn get_or_compute<F>(&self, path: &Path, compute: F) -> String
    where
        F: FnOnce() -> String,
    {
        if let Some(label) = self.get(path) {
            debug!(path = %path.display(), "size cache hit");
            return label;
        }

        debug!(path = %path.display(), "size cache miss");
        let label = compute();

        self.lock()
            .entry(path.to_path_buf())
            .or_insert(label)
            .clone()
    }

    /// Forget every label so the next visit re-measures.
    pub fn clear(&self) {
        let mut labels = self.lock();
        debug!(entries = labels.len(), "clearing size cache");
        labels.clear();
    }

    /// Drop the labels a change at `path` makes stale: the path itself, the
    /// directories containing it and anything measured beneath it.
    pub fn invalidate(&self, path: &Path) -> usize {
        let mut labels = self.lock();
        let before = labels.len();
        labels.retain(|key, _| !path.starts_with(key) && !key.starts_with(path));
        let dropped = before - labels.len();
        debug!(path = %path.display(), dropped, "invalidated size labels");
        dropped
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, String>> {
        // A panic inside `compute` never holds the lock, so a poisoned map is
        // still consistent.
        self.labels.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
