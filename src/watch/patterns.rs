// src/watch/patterns.rs

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::fs::FileSystem;
use crate::types::WatchOptions;

const GLOB_META: &[char] = &['*', '?', '[', ']', '{', '}'];

/// Compiled watch/ignore glob patterns for one watch declaration.
///
/// Patterns are relative to a base directory (the generator's directory).
/// Paths handed to [`WatchMatcher::matches`] must be relative to the same
/// directory and use forward slashes, e.g. `"watched/a.txt"`.
#[derive(Clone)]
pub struct WatchMatcher {
    patterns: Vec<String>,
    watch_set: GlobSet,
    ignore_set: Option<GlobSet>,
    depth: Option<usize>,
}

impl fmt::Debug for WatchMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchMatcher")
            .field("patterns", &self.patterns)
            .field("depth", &self.depth)
            .finish_non_exhaustive()
    }
}

impl WatchMatcher {
    /// Compile `patterns`, applying `options.ignored` as exclusions and
    /// `options.depth` as a limit below each pattern's literal prefix.
    pub fn new(patterns: &[String], options: &WatchOptions) -> Result<Self> {
        if patterns.is_empty() {
            bail!("watch declaration contains no patterns");
        }
        let patterns = patterns
            .iter()
            .map(|p| normalize_pattern(p))
            .collect::<Result<Vec<_>>>()?;

        let watch_set = build_globset(&patterns).context("building watch globset")?;

        let ignored: Vec<String> = options
            .ignored()
            .iter()
            .map(|p| p.trim_start_matches("./").to_string())
            .collect();
        let ignore_set = if ignored.is_empty() {
            None
        } else {
            Some(build_globset(&ignored).context("building ignore globset")?)
        };

        Ok(Self {
            patterns,
            watch_set,
            ignore_set,
            depth: options.depth,
        })
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn depth(&self) -> Option<usize> {
        self.depth
    }

    /// Returns true if `rel_path` (relative to the base directory) is part of
    /// the watch set.
    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.watch_set.is_match(rel_path) {
            return false;
        }
        if let Some(ignore) = &self.ignore_set {
            if ignore.is_match(rel_path) {
                return false;
            }
        }
        if let Some(depth) = self.depth {
            if !self.within_depth(rel_path, depth) {
                return false;
            }
        }
        true
    }

    /// True if `rel_path` sits at most `depth` directories below the literal
    /// prefix of at least one pattern that matches it.
    fn within_depth(&self, rel_path: &str, depth: usize) -> bool {
        let path = Path::new(rel_path);
        self.patterns.iter().any(|pattern| {
            let prefix = static_prefix(pattern);
            match path.strip_prefix(&prefix) {
                Ok(rest) => rest.components().count().saturating_sub(1) <= depth,
                Err(_) => false,
            }
        })
    }

    /// Directories to subscribe to, relative to the base directory.
    ///
    /// Each pattern contributes its literal prefix; prefixes nested inside
    /// another prefix are dropped since subscriptions are recursive.
    pub fn roots(&self) -> Vec<PathBuf> {
        let mut roots: Vec<PathBuf> = self.patterns.iter().map(|p| static_prefix(p)).collect();
        roots.sort();
        roots.dedup();

        let mut kept: Vec<PathBuf> = Vec::new();
        for root in roots {
            if !kept.iter().any(|k| root.starts_with(k)) {
                kept.push(root);
            }
        }
        kept
    }
}

/// Strip a leading `./` and reject patterns that escape the base directory.
fn normalize_pattern(pattern: &str) -> Result<String> {
    let trimmed = pattern.trim();
    let trimmed = trimmed.strip_prefix("./").unwrap_or(trimmed);
    if trimmed.is_empty() {
        bail!("empty watch pattern");
    }
    let path = Path::new(trimmed);
    if path.is_absolute() {
        bail!("watch pattern must be relative to the generator directory: {pattern}");
    }
    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        bail!("watch pattern must not leave the generator directory: {pattern}");
    }
    Ok(trimmed.to_string())
}

/// The leading path components of `pattern` that contain no glob syntax.
///
/// `"watched/**/*.txt"` → `"watched"`, `"*.txt"` → `""`. A pattern without
/// any glob syntax names a single file, so its parent directory is returned.
pub fn static_prefix(pattern: &str) -> PathBuf {
    let mut prefix = PathBuf::new();
    let mut saw_glob = false;
    for part in pattern.split('/') {
        if part.contains(GLOB_META) {
            saw_glob = true;
            break;
        }
        if !part.is_empty() && part != "." {
            prefix.push(part);
        }
    }
    if !saw_glob {
        prefix.pop();
    }
    prefix
}

/// Build a GlobSet from simple string patterns. `*` and `?` never match a
/// `/`; only `**` crosses directories.
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(pat)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Collect every path under `base` matched by `matcher`, as sorted,
/// `/`-separated paths relative to `base`.
///
/// Directories are included when they match. Traversal starts at the
/// matcher's roots; roots that do not exist yet are skipped.
pub fn collect_matching_files(
    fs: &dyn FileSystem,
    base: &Path,
    matcher: &WatchMatcher,
    follow_symlinks: bool,
) -> Result<Vec<String>> {
    let mut found = BTreeSet::new();

    for root in matcher.roots() {
        let start = if root.as_os_str().is_empty() {
            base.to_path_buf()
        } else {
            base.join(&root)
        };
        if !fs.is_dir(&start) {
            continue;
        }

        // (dir, levels below the root)
        let mut stack = vec![(start, 0usize)];
        while let Some((dir, level)) = stack.pop() {
            for path in fs.read_dir(&dir)? {
                if !follow_symlinks && fs.is_symlink(&path) {
                    continue;
                }
                let Ok(rel) = path.strip_prefix(base) else {
                    continue;
                };
                let rel_str = rel.to_string_lossy().replace('\\', "/");

                if fs.is_dir(&path) {
                    if matcher.matches(&rel_str) {
                        found.insert(rel_str);
                    }
                    if matcher.depth().is_none_or(|d| level < d) {
                        stack.push((path, level + 1));
                    }
                } else if fs.is_file(&path) && matcher.matches(&rel_str) {
                    found.insert(rel_str);
                }
            }
        }
    }

    Ok(found.into_iter().collect())
}
