// src/config/validate.rs

use globset::Glob;
use regex::Regex;

use crate::config::model::{ConfigFile, PluginOptions, RawConfigFile, RawPluginSection};
use crate::config::model::{DEFAULT_PLUGIN_NAME, DEFAULT_SUFFIX};
use crate::errors::{Result, VirtualModuleError};
use crate::types::{WatchEventKind, WatchOptions};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = VirtualModuleError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        Ok(ConfigFile {
            plugin: PluginOptions::try_from(raw.plugin)?,
        })
    }
}

impl TryFrom<RawPluginSection> for PluginOptions {
    type Error = VirtualModuleError;

    fn try_from(raw: RawPluginSection) -> std::result::Result<Self, Self::Error> {
        let name = validate_name(raw.name)?;
        let suffix = compile_suffix(raw.suffix.as_deref().unwrap_or(DEFAULT_SUFFIX))?;
        let watch_events = validate_watch_events(raw.watch_events);
        validate_watch_options(&raw.watch_options)?;

        Ok(PluginOptions::new_unchecked(
            name,
            suffix,
            watch_events,
            raw.watch_options,
        ))
    }
}

fn validate_name(name: Option<String>) -> Result<String> {
    match name {
        None => Ok(DEFAULT_PLUGIN_NAME.to_string()),
        Some(n) if n.trim().is_empty() => Err(VirtualModuleError::ConfigError(
            "[plugin].name must not be empty".to_string(),
        )),
        Some(n) => Ok(n),
    }
}

/// Compile the virtual-module suffix pattern.
///
/// A pattern that matches the empty string would claim every request, so it
/// is rejected.
pub(crate) fn compile_suffix(pattern: &str) -> Result<Regex> {
    let regex = Regex::new(pattern).map_err(|e| {
        VirtualModuleError::ConfigError(format!("[plugin].suffix is not a valid regex: {e}"))
    })?;
    if regex.is_match("") {
        return Err(VirtualModuleError::ConfigError(format!(
            "[plugin].suffix must not match the empty string (got {pattern:?})"
        )));
    }
    Ok(regex)
}

fn validate_watch_events(events: Option<Vec<WatchEventKind>>) -> Vec<WatchEventKind> {
    let Some(events) = events else {
        return WatchEventKind::ALL.to_vec();
    };
    let mut deduped = Vec::with_capacity(events.len());
    for event in events {
        if !deduped.contains(&event) {
            deduped.push(event);
        }
    }
    deduped
}

/// Checks shared by the config file and by generator-level overrides.
pub fn validate_watch_options(options: &WatchOptions) -> Result<()> {
    if options.poll_interval_ms == Some(0) {
        return Err(VirtualModuleError::ConfigError(
            "watch_options.poll_interval_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    for pattern in options.ignored() {
        Glob::new(pattern).map_err(|e| {
            VirtualModuleError::ConfigError(format!(
                "watch_options.ignored contains an invalid glob {pattern:?}: {e}"
            ))
        })?;
    }
    Ok(())
}
