// src/watch/event.rs

//! Translation of raw `notify` events into [`WatchEventKind`]s.

use std::path::{Path, PathBuf};

use notify::event::{CreateKind, MetadataKind, ModifyKind, RemoveKind, RenameMode};
use notify::{Event, EventKind};

use crate::fs::FileSystem;
use crate::types::WatchEventKind;

/// A qualifying change inside a watch set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTrigger {
    pub kind: WatchEventKind,
    /// Path relative to the watch base directory, `/`-separated.
    pub path: String,
}

impl WatchTrigger {
    pub fn new(kind: WatchEventKind, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

/// Split a `notify` event into `(kind, absolute path)` pairs.
///
/// Renames become an unlink of the old path and an add of the new one.
/// Access events and anything that cannot be mapped are dropped.
pub fn classify(fs: &dyn FileSystem, event: &Event) -> Vec<(WatchEventKind, PathBuf)> {
    let added = |p: &PathBuf| {
        if fs.is_dir(p) {
            WatchEventKind::AddDir
        } else {
            WatchEventKind::Add
        }
    };

    match &event.kind {
        EventKind::Create(CreateKind::Folder) => tag(WatchEventKind::AddDir, &event.paths),
        EventKind::Create(CreateKind::File) => tag(WatchEventKind::Add, &event.paths),
        EventKind::Create(_) => event.paths.iter().map(|p| (added(p), p.clone())).collect(),

        EventKind::Remove(RemoveKind::Folder) => tag(WatchEventKind::UnlinkDir, &event.paths),
        EventKind::Remove(_) => tag(WatchEventKind::Unlink, &event.paths),

        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut out = Vec::with_capacity(2);
            if let Some(from) = event.paths.first() {
                out.push((WatchEventKind::Unlink, from.clone()));
            }
            if let Some(to) = event.paths.get(1) {
                out.push((added(to), to.clone()));
            }
            out
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            tag(WatchEventKind::Unlink, &event.paths)
        }
        EventKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .iter()
            .map(|p| {
                if fs.exists(p) {
                    (added(p), p.clone())
                } else {
                    (WatchEventKind::Unlink, p.clone())
                }
            })
            .collect(),

        EventKind::Modify(ModifyKind::Metadata(kind))
            if !matches!(kind, MetadataKind::WriteTime | MetadataKind::Any) =>
        {
            Vec::new()
        }
        EventKind::Modify(_) => event
            .paths
            .iter()
            .filter(|p| !fs.is_dir(p))
            .map(|p| (WatchEventKind::Change, p.clone()))
            .collect(),

        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}

fn tag(kind: WatchEventKind, paths: &[PathBuf]) -> Vec<(WatchEventKind, PathBuf)> {
    paths.iter().map(|p| (kind, p.clone())).collect()
}

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// Tries a direct `strip_prefix` first; if that fails (symlinked roots,
/// `/private/var` vs `/var` on macOS) the parent directory of `path` is
/// canonicalized and the file name re-attached, since the path itself may no
/// longer exist after a removal.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(rel.to_string_lossy().replace('\\', "/"));
    }

    let root_canon = root.canonicalize().ok()?;
    let path_canon = path.canonicalize().ok().or_else(|| {
        let parent = path.parent()?.canonicalize().ok()?;
        Some(parent.join(path.file_name()?))
    })?;
    let rel = path_canon.strip_prefix(&root_canon).ok()?;
    Some(rel.to_string_lossy().replace('\\', "/"))
}
