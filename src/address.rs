// src/address.rs

//! Cache-busting import addresses.
//!
//! Importers cache generator instances per address. After the generator file
//! changes, the next load uses a busted address so that a fresh instance is
//! created instead of the cached one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Query parameter reserved for cache busting.
pub const BUST_PARAM: &str = "__killcache";

static LAST_STAMP: AtomicU64 = AtomicU64::new(0);

/// Append a fresh `__killcache=<timestamp>` parameter to `address`.
///
/// Timestamps are strictly increasing within the process, so two calls never
/// return the same string.
pub fn bust(address: &str) -> String {
    let stamp = next_stamp();
    let sep = if address.contains('?') { '&' } else { '?' };
    format!("{address}{sep}{BUST_PARAM}={stamp}")
}

/// Remove any `__killcache` parameter from `address`.
pub fn strip_bust(address: &str) -> String {
    let Some((path, query)) = address.split_once('?') else {
        return address.to_string();
    };
    let prefix = format!("{BUST_PARAM}=");
    let kept: Vec<&str> = query
        .split('&')
        .filter(|segment| !segment.starts_with(&prefix) && *segment != BUST_PARAM)
        .collect();
    if kept.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{}", kept.join("&"))
    }
}

/// True if `address` carries a cache-bust parameter.
pub fn is_busted(address: &str) -> bool {
    strip_bust(address).len() != address.len()
}

fn next_stamp() -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);

    let mut last = LAST_STAMP.load(Ordering::Relaxed);
    loop {
        let candidate = now.max(last + 1);
        match LAST_STAMP.compare_exchange_weak(last, candidate, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return candidate,
            Err(actual) => last = actual,
        }
    }
}
