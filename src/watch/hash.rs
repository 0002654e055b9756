// src/watch/hash.rs

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use blake3::Hasher;

use crate::fs::FileSystem;

/// Compute the blake3 hash of a single file, hex encoded.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut reader = fs
        .open_read(path)
        .with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Tracks the last seen content hash of one file.
///
/// Used to tell real edits apart from events that leave the content as it
/// was (touch, save without changes, metadata updates).
#[derive(Debug, Default)]
pub struct ContentFingerprint {
    last: Option<String>,
}

impl ContentFingerprint {
    /// Fingerprint the current content of `path`. An unreadable file yields
    /// an empty fingerprint.
    pub fn capture(fs: &dyn FileSystem, path: &Path) -> Self {
        Self {
            last: compute_file_hash(fs, path).ok(),
        }
    }

    /// Re-hash `path` and report whether the content differs from the last
    /// observation. Unreadable files always count as changed.
    pub fn refresh(&mut self, fs: &dyn FileSystem, path: &Path) -> bool {
        match compute_file_hash(fs, path) {
            Ok(hash) => {
                let changed = self.last.as_deref() != Some(hash.as_str());
                self.last = Some(hash);
                changed
            }
            Err(_) => {
                self.last = None;
                true
            }
        }
    }
}
