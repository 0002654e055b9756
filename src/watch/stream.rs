// src/watch/stream.rs

//! Watch sets as an explicit async sequence.
//!
//! [`WatchStream::open`] subscribes to a set of glob patterns. The first item
//! produced by [`WatchStream::next`] is always [`WatchSignal::Ready`] with the
//! initial match snapshot; every later item is a qualifying change. Dropping
//! the stream ends the subscription.

use std::collections::VecDeque;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::{RecursiveMode, Watcher};
use tracing::{debug, trace};

use crate::errors::{Result, VirtualModuleError};
use crate::fs::FileSystem;
use crate::types::{WatchEventKind, WatchOptions};
use crate::watch::event::{classify, relative_str, WatchTrigger};
use crate::watch::patterns::{collect_matching_files, WatchMatcher};
use crate::watch::watcher::{new_notify_watcher, RawEvents};

/// One item of a [`WatchStream`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchSignal {
    /// The initial scan settled; sorted relative paths of every match.
    Ready(Vec<String>),
    /// A change to a matched path whose kind is in the trigger set.
    Event(WatchTrigger),
}

pub struct WatchStream {
    base: PathBuf,
    matcher: WatchMatcher,
    events: Vec<WatchEventKind>,
    fs: Arc<dyn FileSystem>,
    rx: RawEvents,
    snapshot: Option<Vec<String>>,
    pending: VecDeque<WatchTrigger>,
    _watcher: Box<dyn Watcher + Send>,
}

impl fmt::Debug for WatchStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchStream")
            .field("base", &self.base)
            .field("matcher", &self.matcher)
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

impl WatchStream {
    /// Subscribe to `patterns` under `base`, reading the tree through `fs`.
    ///
    /// The subscription is registered before the initial scan so no change
    /// between the two is lost. The scan runs on the blocking pool. No OS
    /// subscription is made when `fs` does not support watching; the stream
    /// then yields its snapshot and nothing after it.
    pub async fn open(
        fs: Arc<dyn FileSystem>,
        base: impl Into<PathBuf>,
        patterns: &[String],
        events: &[WatchEventKind],
        options: &WatchOptions,
    ) -> Result<Self> {
        let base = base.into();
        let matcher = WatchMatcher::new(patterns, options)
            .map_err(|e| VirtualModuleError::Watch(format!("{e:#}")))?;

        let (mut watcher, rx) = new_notify_watcher(options)?;
        if fs.supports_watch() {
            let mode = if matcher.depth() == Some(0) {
                RecursiveMode::NonRecursive
            } else {
                RecursiveMode::Recursive
            };
            for root in subscription_roots(fs.as_ref(), &base, &matcher) {
                debug!(root = ?root, "subscribing watch root");
                watcher
                    .watch(&root, mode)
                    .map_err(|e| VirtualModuleError::Watch(format!("watching {:?}: {e}", root)))?;
            }
        } else {
            debug!(base = ?base, "filesystem has no change notifications; scanning only");
        }

        let snapshot = scan(
            Arc::clone(&fs),
            base.clone(),
            matcher.clone(),
            options.follow_symlinks(),
        )
        .await?;

        Ok(Self {
            base,
            matcher,
            events: events.to_vec(),
            fs,
            rx,
            snapshot: Some(snapshot),
            pending: VecDeque::new(),
            _watcher: watcher,
        })
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Next signal, or `None` once the underlying watcher has shut down.
    pub async fn next(&mut self) -> Option<Result<WatchSignal>> {
        if let Some(snapshot) = self.snapshot.take() {
            return Some(Ok(WatchSignal::Ready(snapshot)));
        }

        loop {
            if let Some(trigger) = self.pending.pop_front() {
                return Some(Ok(WatchSignal::Event(trigger)));
            }

            let event = match self.rx.recv().await? {
                Ok(event) => event,
                Err(err) => {
                    return Some(Err(VirtualModuleError::Watch(format!(
                        "watching {:?}: {err}",
                        self.base
                    ))));
                }
            };
            trace!(?event, "raw watch event");

            for (kind, path) in classify(self.fs.as_ref(), &event) {
                if let Some(trigger) = self.qualify(kind, &path) {
                    self.pending.push_back(trigger);
                }
            }
        }
    }

    /// Keep only events in the trigger set whose path is part of the watch set.
    fn qualify(&self, kind: WatchEventKind, path: &Path) -> Option<WatchTrigger> {
        if !self.events.contains(&kind) {
            return None;
        }
        let rel = relative_str(&self.base, path)?;
        if rel.is_empty() || !self.matcher.matches(&rel) {
            return None;
        }
        Some(WatchTrigger::new(kind, rel))
    }
}

/// Initial scan of the watch set, off the async worker threads.
async fn scan(
    fs: Arc<dyn FileSystem>,
    base: PathBuf,
    matcher: WatchMatcher,
    follow_symlinks: bool,
) -> Result<Vec<String>> {
    tokio::task::spawn_blocking(move || {
        collect_matching_files(fs.as_ref(), &base, &matcher, follow_symlinks)
            .map_err(|e| VirtualModuleError::Watch(format!("scanning {:?}: {e:#}", base)))
    })
    .await
    .map_err(|e| VirtualModuleError::Watch(format!("watch scan task failed: {e}")))?
}

/// Absolute directories to subscribe to: each matcher root, or its nearest
/// existing ancestor inside `base` when the root does not exist yet.
fn subscription_roots(fs: &dyn FileSystem, base: &Path, matcher: &WatchMatcher) -> Vec<PathBuf> {
    let mut out: Vec<PathBuf> = Vec::new();
    for root in matcher.roots() {
        let mut candidate = base.join(&root);
        while !fs.is_dir(&candidate) && candidate != base {
            if !candidate.pop() {
                break;
            }
        }
        if !out.contains(&candidate) {
            out.push(candidate);
        }
    }
    // A recursive watch on an ancestor already covers its descendants.
    let all = out.clone();
    out.retain(|p| !all.iter().any(|other| other != p && p.starts_with(other)));
    out
}
