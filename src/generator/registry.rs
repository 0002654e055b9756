// src/generator/registry.rs

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{anyhow, Result};
use tracing::debug;

use crate::address::{is_busted, strip_bust};
use crate::generator::Generator;
use crate::identity::base_path;

/// Resolves an import address to a generator instance.
///
/// Implementations are expected to behave like a module loader: the same
/// address yields the same instance, a different address (such as a
/// cache-busted one) may yield a fresh instance.
pub trait GeneratorImporter: Send + Sync {
    fn import(&self, address: &str) -> Result<Arc<dyn Generator>>;
}

/// Builds a generator for the file at the given path.
pub type GeneratorFactory = Arc<dyn Fn(&Path) -> Result<Arc<dyn Generator>> + Send + Sync>;

/// In-process [`GeneratorImporter`].
///
/// Factories are registered per file path or per file extension. Instances
/// are cached by full import address, so state held by a generator survives
/// until the address changes. A new instance replaces whatever was cached for
/// the same address with or without a cache-bust parameter.
#[derive(Default)]
pub struct GeneratorRegistry {
    by_path: HashMap<PathBuf, GeneratorFactory>,
    by_extension: HashMap<String, GeneratorFactory>,
    instances: Mutex<HashMap<String, Arc<dyn Generator>>>,
}

impl fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorRegistry")
            .field("paths", &self.by_path.keys().collect::<Vec<_>>())
            .field("extensions", &self.by_extension.keys().collect::<Vec<_>>())
            .field("instances", &self.instance_count())
            .finish()
    }
}

impl GeneratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for one generator file.
    pub fn register<F>(&mut self, path: impl Into<PathBuf>, factory: F) -> &mut Self
    where
        F: Fn(&Path) -> Result<Arc<dyn Generator>> + Send + Sync + 'static,
    {
        self.by_path.insert(path.into(), Arc::new(factory));
        self
    }

    /// Register a stateless generator for one file; every import shares it.
    pub fn register_generator<G>(&mut self, path: impl Into<PathBuf>, generator: G) -> &mut Self
    where
        G: Generator + 'static,
    {
        let generator: Arc<dyn Generator> = Arc::new(generator);
        self.register(path, move |_| Ok(Arc::clone(&generator)))
    }

    /// Register a factory for every file with the given extension
    /// (without the dot, e.g. `"toml"`).
    pub fn register_extension<F>(&mut self, extension: &str, factory: F) -> &mut Self
    where
        F: Fn(&Path) -> Result<Arc<dyn Generator>> + Send + Sync + 'static,
    {
        self.by_extension
            .insert(extension.trim_start_matches('.').to_string(), Arc::new(factory));
        self
    }

    /// Number of cached generator instances.
    pub fn instance_count(&self) -> usize {
        self.lock_instances().len()
    }

    fn lock_instances(&self) -> MutexGuard<'_, HashMap<String, Arc<dyn Generator>>> {
        self.instances.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn factory_for(&self, path: &Path) -> Option<&GeneratorFactory> {
        self.by_path.get(path).or_else(|| {
            let ext = path.extension()?.to_str()?;
            self.by_extension.get(ext)
        })
    }
}

impl GeneratorImporter for GeneratorRegistry {
    fn import(&self, address: &str) -> Result<Arc<dyn Generator>> {
        if let Some(existing) = self.lock_instances().get(address) {
            return Ok(Arc::clone(existing));
        }

        let path = Path::new(base_path(address));
        let factory = self
            .factory_for(path)
            .ok_or_else(|| anyhow!("no generator registered for {:?}", path))?;

        debug!(address, busted = is_busted(address), "instantiating generator");
        let generator = factory(path)?;

        // A fresh instance supersedes every earlier one for the same plain
        // address (busted or not), so at most one survives per address.
        let plain = strip_bust(address);
        let mut instances = self.lock_instances();
        instances.retain(|cached, _| strip_bust(cached) != plain);
        instances.insert(address.to_string(), Arc::clone(&generator));
        Ok(generator)
    }
}
