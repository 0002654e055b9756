// src/engine/mod.rs

//! Lifecycle management for virtual modules.
//!
//! A [`Session`] holds all per-module state for one build or dev-server run:
//! - the generator-file watcher of each module (serve mode only)
//! - the dependent-file watcher of each module
//! - pending cache-bust addresses and watch triggers
//!
//! Each content request tears down the module's previous watchers before
//! setting up new ones, so there is never more than one of each per id.

pub mod registry;
pub mod reload;
pub mod session;

pub use registry::WatcherRegistry;
pub use reload::ReloadHandle;
pub use session::Session;

/// Per-module lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    /// No generator watcher and no pending address override.
    Idle,
    /// Generator watcher active; imports use the plain address.
    Watching,
    /// The generator file changed; the next load imports from a cache-busted
    /// address.
    Busted,
}
