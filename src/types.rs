// src/types.rs

use std::fmt;

use serde::Deserialize;

/// Kind of filesystem change reported for a watched path.
///
/// The names match the event vocabulary used in configuration files:
/// `add`, `change`, `unlink`, `addDir`, `unlinkDir`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WatchEventKind {
    Add,
    Change,
    Unlink,
    AddDir,
    UnlinkDir,
}

impl WatchEventKind {
    /// Every kind, in the order used for the default trigger set.
    pub const ALL: [WatchEventKind; 5] = [
        WatchEventKind::Add,
        WatchEventKind::Unlink,
        WatchEventKind::Change,
        WatchEventKind::UnlinkDir,
        WatchEventKind::AddDir,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WatchEventKind::Add => "add",
            WatchEventKind::Change => "change",
            WatchEventKind::Unlink => "unlink",
            WatchEventKind::AddDir => "addDir",
            WatchEventKind::UnlinkDir => "unlinkDir",
        }
    }
}

impl fmt::Display for WatchEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tuning knobs for a watch subscription.
///
/// Every field is optional so that a generator can override just the fields
/// it cares about; see [`WatchOptions::merged_over`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchOptions {
    /// Glob patterns (relative to the watch base directory) that never match.
    #[serde(default)]
    pub ignored: Option<Vec<String>>,

    /// Maximum number of directory levels to descend below each watch root.
    #[serde(default)]
    pub depth: Option<usize>,

    /// Use the polling backend instead of the platform's native one.
    #[serde(default)]
    pub use_polling: Option<bool>,

    /// Poll interval in milliseconds (polling backend only).
    #[serde(default)]
    pub poll_interval_ms: Option<u64>,

    /// Follow symlinks while scanning and watching.
    #[serde(default)]
    pub follow_symlinks: Option<bool>,
}

impl WatchOptions {
    /// Overlay `self` on top of `base`: any field set here wins, unset fields
    /// fall back to `base`.
    pub fn merged_over(&self, base: &WatchOptions) -> WatchOptions {
        WatchOptions {
            ignored: self.ignored.clone().or_else(|| base.ignored.clone()),
            depth: self.depth.or(base.depth),
            use_polling: self.use_polling.or(base.use_polling),
            poll_interval_ms: self.poll_interval_ms.or(base.poll_interval_ms),
            follow_symlinks: self.follow_symlinks.or(base.follow_symlinks),
        }
    }

    pub fn ignored(&self) -> &[String] {
        self.ignored.as_deref().unwrap_or(&[])
    }

    pub fn use_polling(&self) -> bool {
        self.use_polling.unwrap_or(false)
    }

    pub fn follow_symlinks(&self) -> bool {
        self.follow_symlinks.unwrap_or(true)
    }
}
