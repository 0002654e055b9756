// src/watch/watcher.rs

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, PollWatcher, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::errors::{Result, VirtualModuleError};
use crate::fs::FileSystem;
use crate::types::{WatchEventKind, WatchOptions};
use crate::watch::event::classify;

/// Receiving end of the channel fed by the `notify` callback thread.
pub(crate) type RawEvents = mpsc::UnboundedReceiver<notify::Result<Event>>;

/// Handle for a running watcher task.
///
/// The task owns the underlying `notify` watcher. Closing or dropping this
/// handle aborts the task, which releases the OS-level watch.
pub struct WatcherHandle {
    label: String,
    task: JoinHandle<()>,
}

impl fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatcherHandle")
            .field("label", &self.label)
            .field("finished", &self.task.is_finished())
            .finish()
    }
}

impl WatcherHandle {
    pub(crate) fn new(label: impl Into<String>, task: JoinHandle<()>) -> Self {
        Self {
            label: label.into(),
            task,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// True once the watcher task has stopped.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop watching. Equivalent to dropping the handle.
    pub fn close(self) {
        debug!(label = %self.label, "closing watcher");
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Create a `notify` watcher whose events are forwarded into a tokio channel.
///
/// `options.use_polling` selects the polling backend; `poll_interval_ms` and
/// `follow_symlinks` are passed through to the backend config.
pub(crate) fn new_notify_watcher(
    options: &WatchOptions,
) -> Result<(Box<dyn Watcher + Send>, RawEvents)> {
    let (tx, rx) = mpsc::unbounded_channel::<notify::Result<Event>>();

    // Called synchronously on the notify thread. A send error only means the
    // receiving task is gone, i.e. the watcher is being torn down.
    let handler = move |res: notify::Result<Event>| {
        let _ = tx.send(res);
    };

    let mut config = Config::default().with_follow_symlinks(options.follow_symlinks());
    if let Some(ms) = options.poll_interval_ms {
        config = config.with_poll_interval(Duration::from_millis(ms));
    }

    let watcher: Box<dyn Watcher + Send> = if options.use_polling() {
        Box::new(PollWatcher::new(handler, config)?)
    } else {
        Box::new(RecommendedWatcher::new(handler, config)?)
    };

    Ok((watcher, rx))
}

/// Watch a single file and call `on_event` for every change to it.
///
/// The parent directory is watched non-recursively and events are filtered
/// by file name, so the watch survives editors that save by replacing the
/// file. When `fs` does not support watching, the handle is still returned
/// but never reports anything.
pub fn spawn_file_watcher<F>(
    fs: Arc<dyn FileSystem>,
    path: impl Into<PathBuf>,
    options: &WatchOptions,
    on_event: F,
) -> Result<WatcherHandle>
where
    F: Fn(WatchEventKind) + Send + 'static,
{
    let path = path.into();
    let file_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .ok_or_else(|| VirtualModuleError::Watch(format!("not a file path: {:?}", path)))?;
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let (mut watcher, mut rx) = new_notify_watcher(options)?;
    if fs.supports_watch() {
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|e| VirtualModuleError::Watch(format!("watching {:?}: {e}", dir)))?;
    }

    debug!(?path, "file watcher started");

    let label = path.display().to_string();
    let task = tokio::spawn(async move {
        // Keep the watcher alive for as long as this task runs.
        let _watcher = watcher;

        while let Some(res) = rx.recv().await {
            match res {
                Ok(event) => {
                    for (kind, changed) in classify(fs.as_ref(), &event) {
                        if is_same_file(&changed, &dir, &file_name) {
                            debug!(path = ?changed, %kind, "watched file event");
                            on_event(kind);
                        }
                    }
                }
                Err(err) => warn!(path = ?path, error = %err, "file watch error"),
            }
        }
    });

    Ok(WatcherHandle::new(label, task))
}

fn is_same_file(changed: &Path, dir: &Path, file_name: &std::ffi::OsStr) -> bool {
    if changed.file_name() != Some(file_name) {
        return false;
    }
    match changed.parent() {
        Some(parent) if parent == dir => true,
        Some(parent) => match (parent.canonicalize(), dir.canonicalize()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        },
        None => false,
    }
}
