// src/generator/mod.rs

//! The contract between the session and generator authors.
//!
//! A [`Generator`] receives an [`InvocationContext`] and returns a
//! [`Loader`]. The loader says which files (if any) the module depends on and
//! how to turn them into [`ModuleContent`]. Any closure of the shape
//! `Fn(InvocationContext) -> impl Future<Output = anyhow::Result<Option<Loader>>>`
//! is a generator.

pub mod registry;

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use crate::content::ModuleContent;
use crate::engine::ReloadHandle;
use crate::host::Command;
use crate::types::{WatchEventKind, WatchOptions};
use crate::watch::WatchTrigger;

pub use registry::{GeneratorFactory, GeneratorImporter, GeneratorRegistry};

/// Boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

type LoadFn =
    Box<dyn FnOnce(WatchResult) -> BoxFuture<'static, anyhow::Result<ModuleContent>> + Send>;

/// Everything a generator knows about the request it is serving.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    /// Resolved module id (sentinel-prefixed, with query).
    pub id: String,
    pub is_serve: bool,
    /// Address the generator was imported from; differs from the plain
    /// address right after the generator file changed.
    pub import_path: String,
    pub command: Command,
    /// The generator's own file.
    pub file_path: PathBuf,
    pub queries: BTreeMap<String, String>,
    /// Ask the host to request this module's content again.
    pub reload: ReloadHandle,
}

impl InvocationContext {
    pub fn query(&self, key: &str) -> Option<&str> {
        self.queries.get(key).map(String::as_str)
    }

    /// Directory containing the generator; watch patterns are relative to it.
    pub fn dir(&self) -> &Path {
        match self.file_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        }
    }

    pub fn reload(&self) {
        self.reload.reload();
    }
}

/// Input to a loader's content callback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchResult {
    /// Sorted paths matched by the loader's `watch` patterns, relative to the
    /// generator directory. Empty when the loader declares no watch set.
    pub files: Vec<String>,
    /// The change that caused this reload, if a watch-set change did.
    pub trigger: Option<WatchTrigger>,
}

/// What a generator returns: a content callback plus an optional watch
/// declaration.
pub struct Loader {
    watch: Vec<String>,
    watch_events: Option<Vec<WatchEventKind>>,
    watch_options: Option<WatchOptions>,
    load: LoadFn,
}

impl fmt::Debug for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loader")
            .field("watch", &self.watch)
            .field("watch_events", &self.watch_events)
            .field("watch_options", &self.watch_options)
            .finish_non_exhaustive()
    }
}

impl Loader {
    pub fn new<F, Fut, C>(load: F) -> Self
    where
        F: FnOnce(WatchResult) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<C>> + Send + 'static,
        C: Into<ModuleContent>,
    {
        Self {
            watch: Vec::new(),
            watch_events: None,
            watch_options: None,
            load: Box::new(move |result| {
                let fut = load(result);
                Box::pin(async move { fut.await.map(Into::into) })
            }),
        }
    }

    /// Loader that always produces `content` and watches nothing.
    pub fn from_content(content: impl Into<ModuleContent>) -> Self {
        let content = content.into();
        Self::new(move |_| async move { Ok(content) })
    }

    /// Glob patterns, relative to the generator directory, whose changes
    /// should reload the module.
    pub fn watch<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.watch.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Override the plugin-level trigger event set.
    pub fn watch_events(mut self, events: impl IntoIterator<Item = WatchEventKind>) -> Self {
        self.watch_events = Some(events.into_iter().collect());
        self
    }

    /// Override individual plugin-level watch options.
    pub fn watch_options(mut self, options: WatchOptions) -> Self {
        self.watch_options = Some(options);
        self
    }

    pub fn patterns(&self) -> &[String] {
        &self.watch
    }

    pub fn has_watch(&self) -> bool {
        !self.watch.is_empty()
    }

    /// Trigger events for this loader: its own override, else `defaults`.
    pub fn effective_events(&self, defaults: &[WatchEventKind]) -> Vec<WatchEventKind> {
        self.watch_events
            .clone()
            .unwrap_or_else(|| defaults.to_vec())
    }

    /// Watch options for this loader, merged field by field over `defaults`.
    pub fn effective_options(&self, defaults: &WatchOptions) -> WatchOptions {
        match &self.watch_options {
            Some(own) => own.merged_over(defaults),
            None => defaults.clone(),
        }
    }

    /// Run the content callback.
    pub async fn load(self, result: WatchResult) -> anyhow::Result<ModuleContent> {
        (self.load)(result).await
    }
}

/// Produces a [`Loader`] for one content request.
///
/// Returning `Ok(None)` is a contract violation reported by the session.
pub trait Generator: Send + Sync {
    fn generate(&self, ctx: InvocationContext) -> BoxFuture<'_, anyhow::Result<Option<Loader>>>;
}

impl<F, Fut> Generator for F
where
    F: Fn(InvocationContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Option<Loader>>> + Send + 'static,
{
    fn generate(&self, ctx: InvocationContext) -> BoxFuture<'_, anyhow::Result<Option<Loader>>> {
        Box::pin(self(ctx))
    }
}
