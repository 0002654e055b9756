// src/watch/materialize.rs

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::errors::{Result, VirtualModuleError};
use crate::fs::FileSystem;
use crate::types::{WatchEventKind, WatchOptions};
use crate::watch::event::WatchTrigger;
use crate::watch::patterns::{collect_matching_files, WatchMatcher};
use crate::watch::stream::{WatchSignal, WatchStream};
use crate::watch::watcher::WatcherHandle;

/// Subscribe to `patterns` under `base_dir` (read through `fs`), wait for the initial scan and
/// return its sorted match list.
///
/// The rest of the stream is consumed by a background task that calls
/// `on_event` for every qualifying change. The returned handle owns that
/// task; closing it ends the subscription.
pub async fn materialize<F>(
    fs: Arc<dyn FileSystem>,
    base_dir: &Path,
    patterns: &[String],
    events: &[WatchEventKind],
    options: &WatchOptions,
    on_event: F,
) -> Result<(Vec<String>, WatcherHandle)>
where
    F: Fn(WatchTrigger) + Send + 'static,
{
    let mut stream = WatchStream::open(fs, base_dir, patterns, events, options).await?;

    let files = match stream.next().await {
        Some(Ok(WatchSignal::Ready(files))) => files,
        Some(Ok(WatchSignal::Event(_))) | None => {
            return Err(VirtualModuleError::Watch(format!(
                "watch on {:?} ended before the initial scan settled",
                base_dir
            )));
        }
        Some(Err(err)) => return Err(err),
    };
    debug!(base = ?base_dir, count = files.len(), "watch set settled");

    let label = format!("{} [{}]", base_dir.display(), patterns.join(", "));
    let task = tokio::spawn(async move {
        while let Some(signal) = stream.next().await {
            match signal {
                Ok(WatchSignal::Event(trigger)) => {
                    debug!(kind = %trigger.kind, path = %trigger.path, "watch set changed");
                    on_event(trigger);
                }
                Ok(WatchSignal::Ready(_)) => {}
                Err(err) => warn!(base = ?stream.base(), error = %err, "watch error"),
            }
        }
    });

    Ok((files, WatcherHandle::new(label, task)))
}

/// One-off scan of the watch set without subscribing, for builds where no
/// change could ever be acted upon.
pub fn snapshot(
    fs: &dyn FileSystem,
    base_dir: &Path,
    patterns: &[String],
    options: &WatchOptions,
) -> Result<Vec<String>> {
    let matcher = WatchMatcher::new(patterns, options)
        .map_err(|e| VirtualModuleError::Watch(format!("{e:#}")))?;
    collect_matching_files(fs, base_dir, &matcher, options.follow_symlinks())
        .map_err(|e| VirtualModuleError::Watch(format!("scanning {:?}: {e:#}", base_dir)))
}
