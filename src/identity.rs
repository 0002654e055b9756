// src/identity.rs

//! Virtual-module request ids.
//!
//! A request such as `./data.rs?virtual-module&type=authors` names a
//! generator file (`./data.rs`) plus query parameters. Once resolved, the id
//! is prefixed with [`VIRTUAL_PREFIX`] so that no other pipeline stage tries
//! to read it as a plain file.

use std::collections::BTreeMap;

use regex::Regex;

/// Sentinel marking an id as owned by this plugin.
pub const VIRTUAL_PREFIX: char = '\0';

/// Recognises and decomposes virtual-module ids.
#[derive(Debug, Clone)]
pub struct IdentityCodec {
    suffix: Regex,
}

impl IdentityCodec {
    pub fn new(suffix: Regex) -> Self {
        Self { suffix }
    }

    /// True if `id` carries the virtual-module marker.
    pub fn matches(&self, id: &str) -> bool {
        self.suffix.is_match(id)
    }

    /// Mark `id` as virtual. Already-marked ids are returned unchanged.
    pub fn to_opaque_id(&self, id: &str) -> String {
        to_opaque_id(id)
    }
}

/// Prefix `id` with the sentinel.
pub fn to_opaque_id(id: &str) -> String {
    if id.starts_with(VIRTUAL_PREFIX) {
        id.to_string()
    } else {
        format!("{VIRTUAL_PREFIX}{id}")
    }
}

/// `id` without the sentinel: the path plus its full query string.
pub fn import_address(id: &str) -> &str {
    id.strip_prefix(VIRTUAL_PREFIX).unwrap_or(id)
}

/// The generator's file path: sentinel and query string removed.
pub fn base_path(id: &str) -> &str {
    let id = import_address(id);
    match id.find('?') {
        Some(idx) => &id[..idx],
        None => id,
    }
}

/// Parse the query string of `id` into key/value pairs.
///
/// `key=value` pairs map directly, a bare `flag` maps to an empty string and
/// empty segments are skipped. No percent-decoding is applied. When a key
/// repeats, the last occurrence wins.
pub fn query_params(id: &str) -> BTreeMap<String, String> {
    let id = import_address(id);
    let Some((_, query)) = id.split_once('?') else {
        return BTreeMap::new();
    };

    query
        .split('&')
        .filter(|segment| !segment.is_empty())
        .map(|segment| match segment.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (segment.to_string(), String::new()),
        })
        .collect()
}
