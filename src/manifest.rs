// src/manifest.rs

//! Declarative generators written as TOML.
//!
//! ```toml
//! watch = ["watched/**/*.txt"]
//! watch_events = ["add", "change"]
//!
//! [data]
//! title = "Authors"
//! ```
//!
//! The produced module's default export is
//! `{ data, queries, files: { "<path>": "<contents>" }, trigger }`, where
//! `files` holds every watched file (read relative to the manifest) and
//! `trigger` describes the change that caused the reload, or is `null`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::json;

use crate::content::to_content_module;
use crate::fs::{FileSystem, RealFileSystem};
use crate::generator::{BoxFuture, Generator, InvocationContext, Loader, WatchResult};
use crate::types::{WatchEventKind, WatchOptions};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub watch: Vec<String>,

    #[serde(default)]
    pub watch_events: Option<Vec<WatchEventKind>>,

    #[serde(default)]
    pub watch_options: Option<WatchOptions>,

    /// Arbitrary data passed through to the module.
    #[serde(default)]
    pub data: toml::Table,
}

impl Manifest {
    pub fn load(fs: &dyn FileSystem, path: &Path) -> Result<Self> {
        let text = fs.read_to_string(path)?;
        toml::from_str(&text).with_context(|| format!("parsing manifest {:?}", path))
    }
}

/// Generator backed by a TOML manifest. The manifest is re-read on every
/// invocation.
#[derive(Debug, Clone)]
pub struct ManifestGenerator {
    path: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl ManifestGenerator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_fs(path, Arc::new(RealFileSystem))
    }

    pub fn with_fs(path: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            path: path.into(),
            fs,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Factory suitable for
    /// [`GeneratorRegistry::register_extension`](crate::generator::GeneratorRegistry::register_extension).
    pub fn factory() -> impl Fn(&Path) -> Result<Arc<dyn Generator>> + Send + Sync + 'static {
        |path: &Path| -> Result<Arc<dyn Generator>> {
            Ok(Arc::new(ManifestGenerator::new(path)))
        }
    }
}

impl Generator for ManifestGenerator {
    fn generate(&self, ctx: InvocationContext) -> BoxFuture<'_, Result<Option<Loader>>> {
        Box::pin(async move {
            let manifest = Manifest::load(self.fs.as_ref(), &self.path)?;
            let fs = Arc::clone(&self.fs);
            let dir = ctx.dir().to_path_buf();
            let queries = ctx.queries.clone();
            let data = manifest.data;

            let mut loader = Loader::new(move |result: WatchResult| async move {
                render(fs.as_ref(), &dir, &data, &queries, &result)
            })
            .watch(manifest.watch);
            if let Some(events) = manifest.watch_events {
                loader = loader.watch_events(events);
            }
            if let Some(options) = manifest.watch_options {
                loader = loader.watch_options(options);
            }
            Ok(Some(loader))
        })
    }
}

fn render(
    fs: &dyn FileSystem,
    dir: &Path,
    data: &toml::Table,
    queries: &BTreeMap<String, String>,
    result: &WatchResult,
) -> Result<String> {
    let mut files = BTreeMap::new();
    for rel in &result.files {
        let path = dir.join(rel);
        if !fs.is_file(&path) {
            continue;
        }
        let text = fs
            .read_to_string(&path)
            .with_context(|| format!("reading watched file {rel}"))?;
        files.insert(rel.clone(), text);
    }

    let trigger = result
        .trigger
        .as_ref()
        .map(|t| json!({ "kind": t.kind.as_str(), "path": t.path }));

    let module = json!({
        "data": data,
        "queries": queries,
        "files": files,
        "trigger": trigger,
    });
    Ok(to_content_module(&module)?)
}
