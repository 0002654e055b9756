// src/host/mod.rs

//! The parts of the host build tool this crate talks to.
//!
//! The host drives a [`crate::engine::Session`] through its hook methods and,
//! in serve mode, hands over a [`ModuleGraph`] so reloads can mark modules
//! stale. [`dev`] contains a small host used by the `virtmod` binary.

pub mod dev;

use std::fmt;

/// How the host is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Command {
    /// Interactive dev server: watchers are installed and reloads invalidate
    /// modules in the host's graph.
    Serve,
    /// One-shot build: no watching, reloads are no-ops.
    #[default]
    Build,
}

impl Command {
    pub fn is_serve(&self) -> bool {
        matches!(self, Command::Serve)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Serve => "serve",
            Command::Build => "build",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subset of the host's resolved configuration the session cares about.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolvedConfig {
    pub command: Command,
}

impl ResolvedConfig {
    pub fn new(command: Command) -> Self {
        Self { command }
    }
}

/// The host's module graph, available only in serve mode.
pub trait ModuleGraph: Send + Sync {
    /// True if the graph currently has an entry for `id`.
    fn has_module(&self, id: &str) -> bool;

    /// Mark the entry for `id` stale so the host requests its content again.
    fn invalidate_module(&self, id: &str);
}
