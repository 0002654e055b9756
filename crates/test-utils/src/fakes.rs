use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use tokio::sync::mpsc;
use virtmod::generator::{Generator, GeneratorImporter, GeneratorRegistry};
use virtmod::host::ModuleGraph;

/// Module graph that knows a fixed set of ids and reports every
/// invalidation on a channel.
#[derive(Debug)]
pub struct RecordingModuleGraph {
    known: Mutex<HashSet<String>>,
    invalidated: Mutex<Vec<String>>,
    tx: mpsc::UnboundedSender<String>,
}

impl RecordingModuleGraph {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let graph = Arc::new(Self {
            known: Mutex::new(HashSet::new()),
            invalidated: Mutex::new(Vec::new()),
            tx,
        });
        (graph, rx)
    }

    pub fn add(&self, id: &str) {
        self.known.lock().unwrap().insert(id.to_string());
    }

    pub fn invalidated(&self) -> Vec<String> {
        self.invalidated.lock().unwrap().clone()
    }
}

impl ModuleGraph for RecordingModuleGraph {
    fn has_module(&self, id: &str) -> bool {
        self.known.lock().unwrap().contains(id)
    }

    fn invalidate_module(&self, id: &str) {
        self.invalidated.lock().unwrap().push(id.to_string());
        let _ = self.tx.send(id.to_string());
    }
}

/// Importer that records every address it is asked for and delegates to a
/// [`GeneratorRegistry`].
#[derive(Debug)]
pub struct RecordingImporter {
    inner: GeneratorRegistry,
    addresses: Mutex<Vec<String>>,
}

impl RecordingImporter {
    pub fn new(inner: GeneratorRegistry) -> Arc<Self> {
        Arc::new(Self {
            inner,
            addresses: Mutex::new(Vec::new()),
        })
    }

    pub fn addresses(&self) -> Vec<String> {
        self.addresses.lock().unwrap().clone()
    }

    pub fn registry(&self) -> &GeneratorRegistry {
        &self.inner
    }
}

impl GeneratorImporter for RecordingImporter {
    fn import(&self, address: &str) -> Result<Arc<dyn Generator>> {
        self.addresses.lock().unwrap().push(address.to_string());
        self.inner.import(address)
    }
}

/// Wrap `generator` in a registry factory that counts instantiations.
pub fn counting_factory<G>(
    generator: G,
) -> (
    impl Fn(&std::path::Path) -> Result<Arc<dyn Generator>> + Send + Sync + 'static,
    Arc<AtomicUsize>,
)
where
    G: Generator + 'static,
{
    let generator: Arc<dyn Generator> = Arc::new(generator);
    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);
    let factory = move |_: &std::path::Path| -> Result<Arc<dyn Generator>> {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::clone(&generator))
    };
    (factory, count)
}
