// src/host/dev.rs

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::io::Write;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::Session;
use crate::host::{Command, ModuleGraph, ResolvedConfig};
use crate::identity::import_address;

/// Events flowing into the dev host loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// A module was marked stale and should be produced again.
    Invalidated(String),
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

/// Module graph that records which ids have been produced and turns
/// invalidations into [`HostEvent`]s.
#[derive(Debug)]
pub struct ChannelModuleGraph {
    known: Mutex<HashSet<String>>,
    tx: mpsc::UnboundedSender<HostEvent>,
}

impl ChannelModuleGraph {
    pub fn new(tx: mpsc::UnboundedSender<HostEvent>) -> Self {
        Self {
            known: Mutex::new(HashSet::new()),
            tx,
        }
    }

    pub fn add(&self, id: &str) {
        self.known
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(id.to_string());
    }
}

impl ModuleGraph for ChannelModuleGraph {
    fn has_module(&self, id: &str) -> bool {
        self.known
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .contains(id)
    }

    fn invalidate_module(&self, id: &str) {
        if let Err(err) = self.tx.send(HostEvent::Invalidated(id.to_string())) {
            debug!("dev host loop gone; dropping invalidation: {err}");
        }
    }
}

/// Outcome of a dev host run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DevReport {
    /// Successful content productions, including reloads.
    pub produced: usize,
    /// Requests that produced no content.
    pub failed: usize,
}

/// Minimal host: resolves and loads a fixed set of ids, writes the content
/// to `out`, and in serve mode produces a module again whenever it is
/// invalidated.
pub struct DevHost<W: Write> {
    session: Session,
    command: Command,
    graph: Arc<ChannelModuleGraph>,
    event_tx: mpsc::UnboundedSender<HostEvent>,
    event_rx: mpsc::UnboundedReceiver<HostEvent>,
    out: W,
}

impl<W: Write> fmt::Debug for DevHost<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DevHost")
            .field("session", &self.session)
            .field("command", &self.command)
            .finish_non_exhaustive()
    }
}

impl<W: Write> DevHost<W> {
    pub fn new(session: Session, command: Command, out: W) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let graph = Arc::new(ChannelModuleGraph::new(event_tx.clone()));
        Self {
            session,
            command,
            graph,
            event_tx,
            event_rx,
            out,
        }
    }

    /// Sender into the host loop (shutdown requests, manual invalidations).
    pub fn sender(&self) -> mpsc::UnboundedSender<HostEvent> {
        self.event_tx.clone()
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Main loop.
    ///
    /// - Announces the command and, in serve mode, the module graph.
    /// - Produces every virtual id once.
    /// - In build mode, tears down and returns.
    /// - In serve mode, reproduces invalidated modules until shutdown.
    pub async fn run(&mut self, ids: &[String]) -> Result<DevReport> {
        self.session.config_resolved(ResolvedConfig::new(self.command));
        if self.command.is_serve() {
            let graph: Arc<dyn ModuleGraph> = self.graph.clone();
            self.session.configure_server(graph);
        }

        let mut report = DevReport::default();
        let mut resolved_ids = Vec::new();
        for id in ids {
            match self.session.resolve_id(id) {
                Some(resolved) => resolved_ids.push(resolved),
                None => warn!(id = %id, "not a virtual module request; skipping"),
            }
        }

        for id in &resolved_ids {
            self.produce(id, &mut report).await?;
            self.graph.add(id);
        }

        if self.command.is_serve() && !resolved_ids.is_empty() {
            info!(modules = resolved_ids.len(), "watching for changes");
            self.serve(&mut report).await?;
        }

        self.session.close_bundle();
        info!(produced = report.produced, failed = report.failed, "dev host exiting");
        Ok(report)
    }

    async fn serve(&mut self, report: &mut DevReport) -> Result<()> {
        while let Some(event) = self.event_rx.recv().await {
            debug!(?event, "dev host received event");
            let HostEvent::Invalidated(first) = event else {
                info!("shutdown requested");
                return Ok(());
            };

            // Coalesce invalidations that piled up while we were busy.
            let mut stale = BTreeSet::from([first]);
            let mut shutdown = false;
            while let Ok(more) = self.event_rx.try_recv() {
                match more {
                    HostEvent::Invalidated(id) => {
                        stale.insert(id);
                    }
                    HostEvent::ShutdownRequested => shutdown = true,
                }
            }

            for id in &stale {
                self.produce(id, report).await?;
            }
            if shutdown {
                info!("shutdown requested");
                return Ok(());
            }
        }
        Ok(())
    }

    async fn produce(&mut self, id: &str, report: &mut DevReport) -> Result<()> {
        match self.session.load(id).await {
            Some(content) => {
                report.produced += 1;
                writeln!(self.out, "// {}", import_address(id))?;
                writeln!(self.out, "{}", content.code)?;
                if let Some(map) = &content.map {
                    writeln!(self.out, "// map: {map}")?;
                }
                self.out.flush()?;
            }
            None => {
                report.failed += 1;
                warn!(id = %import_address(id), "no content produced");
            }
        }
        Ok(())
    }
}
