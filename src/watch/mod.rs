// src/watch/mod.rs

//! File watching for virtual modules.
//!
//! This module is responsible for:
//! - Compiling a generator's `watch` globs (plus `ignored` exclusions).
//! - Turning `notify` events into `add` / `change` / `unlink` / `addDir` /
//!   `unlinkDir` triggers.
//! - Materializing a watch set: initial sorted snapshot, then change signals.
//! - Watching a single generator file, with content hashing to ignore
//!   no-op saves.
//!
//! It does **not** know about module ids or the host; callers decide what a
//! change means.

pub mod event;
pub mod hash;
pub mod materialize;
pub mod patterns;
pub mod stream;
pub mod watcher;

pub use event::{relative_str, WatchTrigger};
pub use hash::{compute_file_hash, ContentFingerprint};
pub use materialize::{materialize, snapshot};
pub use patterns::{collect_matching_files, static_prefix, WatchMatcher};
pub use stream::{WatchSignal, WatchStream};
pub use watcher::{spawn_file_watcher, WatcherHandle};
