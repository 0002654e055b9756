// src/engine/registry.rs

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use crate::watch::WatcherHandle;

/// Watchers keyed by module id, at most one per id.
///
/// Inserting for an id that already has a watcher closes the old one first.
#[derive(Debug)]
pub struct WatcherRegistry {
    kind: &'static str,
    handles: Mutex<HashMap<String, WatcherHandle>>,
}

impl WatcherRegistry {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            handles: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, WatcherHandle>> {
        self.handles.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store `handle` for `id`, closing any previous watcher.
    /// Returns true if one was replaced.
    pub fn replace(&self, id: &str, handle: WatcherHandle) -> bool {
        let previous = self.lock().insert(id.to_string(), handle);
        match previous {
            Some(old) => {
                debug!(kind = self.kind, id, "replacing watcher");
                old.close();
                true
            }
            None => false,
        }
    }

    /// Close the watcher for `id`, if any.
    pub fn close(&self, id: &str) -> bool {
        let removed = self.lock().remove(id);
        match removed {
            Some(handle) => {
                debug!(kind = self.kind, id, "closing watcher");
                handle.close();
                true
            }
            None => false,
        }
    }

    /// Close every watcher. Returns how many were open.
    pub fn close_all(&self) -> usize {
        let drained: Vec<WatcherHandle> = self.lock().drain().map(|(_, h)| h).collect();
        let count = drained.len();
        for handle in drained {
            handle.close();
        }
        if count > 0 {
            debug!(kind = self.kind, count, "closed all watchers");
        }
        count
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
