#![allow(dead_code)]

use virtmod::config::{PluginOptions, RawPluginSection};
use virtmod::types::{WatchEventKind, WatchOptions};

/// Builder for `PluginOptions`, going through the same validation as a
/// config file.
#[derive(Debug, Default)]
pub struct PluginOptionsBuilder {
    raw: RawPluginSection,
}

impl PluginOptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: &str) -> Self {
        self.raw.name = Some(name.to_string());
        self
    }

    pub fn suffix(mut self, pattern: &str) -> Self {
        self.raw.suffix = Some(pattern.to_string());
        self
    }

    pub fn watch_events(mut self, events: &[WatchEventKind]) -> Self {
        self.raw.watch_events = Some(events.to_vec());
        self
    }

    pub fn ignored(mut self, pattern: &str) -> Self {
        self.raw
            .watch_options
            .ignored
            .get_or_insert_with(Vec::new)
            .push(pattern.to_string());
        self
    }

    pub fn depth(mut self, depth: usize) -> Self {
        self.raw.watch_options.depth = Some(depth);
        self
    }

    pub fn watch_options(mut self, options: WatchOptions) -> Self {
        self.raw.watch_options = options;
        self
    }

    pub fn build(self) -> PluginOptions {
        PluginOptions::try_from(self.raw).expect("Failed to build valid plugin options from builder")
    }
}

/// Build a module id for the generator at `path` with extra query fragments,
/// e.g. `virtual_id("gen.rs", &["type=authors"])`.
pub fn virtual_id(path: impl AsRef<std::path::Path>, extra: &[&str]) -> String {
    let mut id = format!("{}?virtual-module", path.as_ref().display());
    for fragment in extra {
        id.push('&');
        id.push_str(fragment);
    }
    id
}
