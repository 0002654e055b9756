// src/engine/session.rs

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, error, info, trace, warn};

use crate::address::bust;
use crate::config::validate::validate_watch_options;
use crate::config::PluginOptions;
use crate::content::ModuleContent;
use crate::engine::registry::WatcherRegistry;
use crate::engine::reload::ReloadHandle;
use crate::engine::ModuleState;
use crate::errors::{Result, VirtualModuleError};
use crate::fs::{FileSystem, RealFileSystem};
use crate::generator::{GeneratorImporter, InvocationContext, WatchResult};
use crate::host::{Command, ModuleGraph, ResolvedConfig};
use crate::identity::{self, IdentityCodec};
use crate::types::{WatchEventKind, WatchOptions};
use crate::watch::{materialize, snapshot, spawn_file_watcher, ContentFingerprint, WatchTrigger};

/// Virtual-module lifecycle for one build or dev-server run.
///
/// The host calls the hook methods ([`Session::resolve_id`],
/// [`Session::load`], [`Session::config_resolved`],
/// [`Session::configure_server`], [`Session::close_bundle`]). Cloning is
/// cheap; clones share state.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

pub(crate) struct SessionInner {
    options: PluginOptions,
    codec: IdentityCodec,
    importer: Arc<dyn GeneratorImporter>,
    fs: Arc<dyn FileSystem>,
    host: Mutex<HostState>,
    generator_watchers: WatcherRegistry,
    dependency_watchers: WatcherRegistry,
    /// Cache-busted import address to use for the next load, per id.
    overrides: Mutex<HashMap<String, String>>,
    /// Dependent-file change behind the next load, per id.
    triggers: Mutex<HashMap<String, WatchTrigger>>,
}

#[derive(Default)]
struct HostState {
    command: Command,
    graph: Option<Arc<dyn ModuleGraph>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("plugin", &self.inner.options.name)
            .field("command", &self.inner.command())
            .field("generator_watchers", &self.inner.generator_watchers.len())
            .field("dependency_watchers", &self.inner.dependency_watchers.len())
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(options: PluginOptions, importer: Arc<dyn GeneratorImporter>) -> Self {
        Self::with_fs(options, importer, Arc::new(RealFileSystem))
    }

    /// Like [`Session::new`], scanning watch sets and hashing generator files
    /// through `fs`.
    pub fn with_fs(
        options: PluginOptions,
        importer: Arc<dyn GeneratorImporter>,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        let codec = IdentityCodec::new(options.suffix.clone());
        Self {
            inner: Arc::new(SessionInner {
                options,
                codec,
                importer,
                fs,
                host: Mutex::new(HostState::default()),
                generator_watchers: WatcherRegistry::new("generator"),
                dependency_watchers: WatcherRegistry::new("dependency"),
                overrides: Mutex::new(HashMap::new()),
                triggers: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn options(&self) -> &PluginOptions {
        &self.inner.options
    }

    pub fn codec(&self) -> &IdentityCodec {
        &self.inner.codec
    }

    pub fn command(&self) -> Command {
        self.inner.command()
    }

    // ---- host hooks ----------------------------------------------------

    /// Claim `id` if it is a virtual-module request.
    pub fn resolve_id(&self, id: &str) -> Option<String> {
        if self.inner.codec.matches(id) {
            Some(self.inner.codec.to_opaque_id(id))
        } else {
            None
        }
    }

    pub fn config_resolved(&self, config: ResolvedConfig) {
        debug!(command = %config.command, "config resolved");
        lock(&self.inner.host).command = config.command;
    }

    pub fn configure_server(&self, graph: Arc<dyn ModuleGraph>) {
        lock(&self.inner.host).graph = Some(graph);
    }

    /// Produce content for `id`.
    ///
    /// Errors are logged and turned into `None`, so a broken generator never
    /// takes the host down. Use [`Session::try_load`] to see the error.
    pub async fn load(&self, id: &str) -> Option<ModuleContent> {
        match self.try_load(id).await {
            Ok(content) => content,
            Err(err) => {
                error!(id = %display_id(id), error = %err, "failed to load virtual module");
                None
            }
        }
    }

    /// Close every watcher and forget all per-module state. Idempotent.
    pub fn close_bundle(&self) {
        let inner = &self.inner;
        let closed = inner.generator_watchers.close_all() + inner.dependency_watchers.close_all();
        lock(&inner.overrides).clear();
        lock(&inner.triggers).clear();
        if closed > 0 {
            info!(closed, "closed virtual module watchers");
        }
    }

    // ---- content production -------------------------------------------

    /// Produce content for `id`, returning `Ok(None)` for ids that are not
    /// virtual-module requests.
    pub async fn try_load(&self, id: &str) -> Result<Option<ModuleContent>> {
        let inner = &self.inner;
        if !inner.codec.matches(id) {
            return Ok(None);
        }

        let command = inner.command();
        let file_path = PathBuf::from(identity::base_path(id));
        let plain_address = identity::import_address(id).to_string();

        inner.generator_watchers.close(id);
        inner.dependency_watchers.close(id);

        if command.is_serve() {
            if let Err(err) = self.watch_generator_file(id, &file_path, &plain_address) {
                warn!(id = %display_id(id), error = %err, "could not watch generator file");
            }
        }

        let address = lock(&inner.overrides)
            .get(id)
            .cloned()
            .unwrap_or_else(|| plain_address.clone());
        debug!(id = %display_id(id), address = %address, "importing generator");

        let ctx = InvocationContext {
            id: id.to_string(),
            is_serve: command.is_serve(),
            import_path: address.clone(),
            command,
            file_path,
            queries: identity::query_params(id),
            reload: self.reload_handle(id),
        };

        let generator = inner.importer.import(&address).map_err(|e| {
            inner.contract(id, format!("Unable to import virtual module: {e:#}"))
        })?;

        let loader = generator
            .generate(ctx.clone())
            .await
            .map_err(|e| inner.contract(id, format!("Generator failed: {e:#}")))?
            .ok_or_else(|| inner.contract(id, "No loader returned from generator"))?;

        let trigger = lock(&inner.triggers).remove(id);
        let result = if loader.has_watch() {
            let patterns = loader.patterns().to_vec();
            let events = loader.effective_events(&inner.options.watch_events);
            let options = loader.effective_options(&inner.options.watch_options);
            let files = self
                .watch_dependencies(&ctx, &patterns, &events, &options)
                .await?;
            WatchResult { files, trigger }
        } else {
            WatchResult::default()
        };

        let content = loader.load(result).await.map_err(VirtualModuleError::Load)?;

        inner.settle_override(id, &address);
        Ok(Some(content))
    }

    /// Reload handle for `id`, bound to this session.
    pub fn reload_handle(&self, id: &str) -> ReloadHandle {
        ReloadHandle::new(id, Arc::downgrade(&self.inner))
    }

    /// Current lifecycle state of `id`.
    pub fn module_state(&self, id: &str) -> ModuleState {
        if lock(&self.inner.overrides).contains_key(id) {
            ModuleState::Busted
        } else if self.inner.generator_watchers.contains(id) {
            ModuleState::Watching
        } else {
            ModuleState::Idle
        }
    }

    /// Address the next load of `id` will import from.
    pub fn pending_address(&self, id: &str) -> String {
        lock(&self.inner.overrides)
            .get(id)
            .cloned()
            .unwrap_or_else(|| identity::import_address(id).to_string())
    }

    pub fn generator_watchers(&self) -> &WatcherRegistry {
        &self.inner.generator_watchers
    }

    pub fn dependency_watchers(&self) -> &WatcherRegistry {
        &self.inner.dependency_watchers
    }

    /// Queue a cache-busted address for `id` and request a reload, as the
    /// generator-file watcher does when the generator's content changes.
    pub fn generator_changed(&self, id: &str) {
        self.inner.bust_address(id);
        self.inner.request_reload(id);
    }

    fn watch_generator_file(&self, id: &str, path: &Path, plain_address: &str) -> Result<()> {
        let fingerprint = Mutex::new(ContentFingerprint::capture(self.inner.fs.as_ref(), path));
        let session = Arc::downgrade(&self.inner);
        let watched_id = id.to_string();
        let watched_path = path.to_path_buf();
        let plain_address = plain_address.to_string();

        let fs = Arc::clone(&self.inner.fs);
        let handle = spawn_file_watcher(fs, path, &self.inner.options.watch_options, move |kind| {
            if !matches!(kind, WatchEventKind::Add | WatchEventKind::Change) {
                return;
            }
            let Some(inner) = session.upgrade() else {
                return;
            };
            if !lock(&fingerprint).refresh(inner.fs.as_ref(), &watched_path) {
                trace!(id = %display_id(&watched_id), "generator content unchanged");
                return;
            }
            debug!(id = %display_id(&watched_id), from = %plain_address, "generator file changed");
            inner.bust_address(&watched_id);
            inner.request_reload(&watched_id);
        })?;

        self.inner.generator_watchers.replace(id, handle);
        Ok(())
    }

    /// Resolve a loader's watch set. In serve mode the set stays subscribed
    /// and changes reload the module; in build mode it is a one-off scan.
    async fn watch_dependencies(
        &self,
        ctx: &InvocationContext,
        patterns: &[String],
        events: &[WatchEventKind],
        options: &WatchOptions,
    ) -> Result<Vec<String>> {
        validate_watch_options(options)?;

        if !ctx.is_serve {
            return snapshot(self.inner.fs.as_ref(), ctx.dir(), patterns, options);
        }

        let reload = ctx.reload.clone();
        let fs = Arc::clone(&self.inner.fs);
        let (files, handle) =
            materialize(fs, ctx.dir(), patterns, events, options, move |trigger| {
                reload.reload_for(trigger)
            })
            .await?;

        self.inner.dependency_watchers.replace(&ctx.id, handle);
        Ok(files)
    }
}

impl SessionInner {
    fn command(&self) -> Command {
        lock(&self.host).command
    }

    fn contract(&self, id: &str, message: impl Into<String>) -> VirtualModuleError {
        VirtualModuleError::contract(&self.options.name, message, display_id(id))
    }

    fn bust_address(&self, id: &str) {
        let busted = bust(identity::import_address(id));
        lock(&self.overrides).insert(id.to_string(), busted);
    }

    /// Drop the override for `id` once a load under it succeeded, unless a
    /// newer one was queued meanwhile.
    fn settle_override(&self, id: &str, used: &str) {
        let mut overrides = lock(&self.overrides);
        if overrides.get(id).map(String::as_str) == Some(used) {
            overrides.remove(id);
        }
    }

    pub(crate) fn record_trigger(&self, id: &str, trigger: WatchTrigger) {
        lock(&self.triggers).insert(id.to_string(), trigger);
    }

    /// Mark `id` stale in the host's module graph. Only meaningful in serve
    /// mode; ids the graph does not know are ignored.
    pub(crate) fn request_reload(&self, id: &str) {
        let (command, graph) = {
            let host = lock(&self.host);
            (host.command, host.graph.clone())
        };
        if !command.is_serve() {
            trace!(id = %display_id(id), "reload ignored outside serve mode");
            return;
        }
        let Some(graph) = graph else {
            return;
        };
        if graph.has_module(id) {
            debug!(id = %display_id(id), "invalidating module");
            graph.invalidate_module(id);
        }
    }
}

/// `id` without the sentinel, for logs and error messages.
fn display_id(id: &str) -> &str {
    identity::import_address(id)
}
