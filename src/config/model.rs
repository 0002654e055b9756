// src/config/model.rs

use regex::Regex;
use serde::Deserialize;

use crate::types::{WatchEventKind, WatchOptions};

/// Name reported in contract errors unless the config overrides it.
pub const DEFAULT_PLUGIN_NAME: &str = "virtmod";

/// Marker query token, optionally followed by further `&` query fragments.
pub const DEFAULT_SUFFIX: &str = r"\?virtual-module(&.*)*$";

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [plugin]
/// suffix = '\?virtual-module(&.*)*$'
/// watch_events = ["add", "change", "unlink"]
///
/// [plugin.watch_options]
/// ignored = ["**/*.tmp"]
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub plugin: RawPluginSection,
}

/// `[plugin]` section, exactly as written by the user.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawPluginSection {
    /// Plugin name used in error messages.
    #[serde(default)]
    pub name: Option<String>,

    /// Regex identifying virtual-module requests.
    #[serde(default)]
    pub suffix: Option<String>,

    /// Event kinds that trigger a reload of a module's dependent files.
    #[serde(default)]
    pub watch_events: Option<Vec<WatchEventKind>>,

    /// Default watch options; generators may override individual fields.
    #[serde(default)]
    pub watch_options: WatchOptions,
}

/// Validated plugin options.
///
/// Constructed through `TryFrom<RawPluginSection>` (see `validate.rs`) or
/// [`PluginOptions::default`].
#[derive(Debug, Clone)]
pub struct PluginOptions {
    pub name: String,
    pub suffix: Regex,
    pub watch_events: Vec<WatchEventKind>,
    pub watch_options: WatchOptions,
}

impl PluginOptions {
    pub(crate) fn new_unchecked(
        name: String,
        suffix: Regex,
        watch_events: Vec<WatchEventKind>,
        watch_options: WatchOptions,
    ) -> Self {
        Self {
            name,
            suffix,
            watch_events,
            watch_options,
        }
    }

    /// Replace the suffix pattern, validating it the same way the config
    /// loader does.
    pub fn with_suffix(mut self, pattern: &str) -> crate::errors::Result<Self> {
        self.suffix = crate::config::validate::compile_suffix(pattern)?;
        Ok(self)
    }

    pub fn with_watch_events(mut self, events: Vec<WatchEventKind>) -> Self {
        self.watch_events = events;
        self
    }

    pub fn with_watch_options(mut self, options: WatchOptions) -> Self {
        self.watch_options = options;
        self
    }
}

impl Default for PluginOptions {
    fn default() -> Self {
        let suffix = Regex::new(DEFAULT_SUFFIX).expect("default suffix pattern compiles");
        Self::new_unchecked(
            DEFAULT_PLUGIN_NAME.to_string(),
            suffix,
            WatchEventKind::ALL.to_vec(),
            WatchOptions::default(),
        )
    }
}

/// Validated configuration file.
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    pub plugin: PluginOptions,
}
