// Per-file locking for cache writes.
// Each cache file path gets its own async mutex so unrelated stations merge in parallel.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Slot = Arc<AsyncMutex<()>>;

/// Registry of one async mutex per cache file path.
/// A path's slot exists only while someone holds or waits for it.
#[derive(Debug, Default)]
pub struct FileLocks {
    slots: Mutex<HashMap<PathBuf, Slot>>,
}

/// Exclusive access to one path. Releases the slot when dropped.
#[derive(Debug)]
pub struct FileGuard<'a> {
    locks: &'a FileLocks,
    path: PathBuf,
    guard: Option<OwnedMutexGuard<()>>,
}

impl FileLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `path`. Held until the guard drops.
    pub async fn lock(&self, path: &Path) -> FileGuard<'_> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.entry(path.to_path_buf()).or_default().clone()
        };
        FileGuard {
            locks: self,
            path: path.to_path_buf(),
            guard: Some(slot.lock_owned().await),
        }
    }

    /// Number of paths currently held or waited on.
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop the slot for `path` if nobody else holds a handle to it.
    fn release(&self, path: &Path) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if slots
            .get(path)
            .is_some_and(|slot| Arc::strong_count(slot) == 1)
        {
            slots.remove(path);
        }
    }
}

impl Drop for FileGuard<'_> {
    fn drop(&mut self) {
        // Unlock first so the slot's only remaining handle is the registry's
        drop(self.guard.take());
        self.locks.release(&self.path);
    }
}
