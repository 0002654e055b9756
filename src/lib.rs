// src/lib.rs

//! Generator-backed virtual modules.
//!
//! A request like `data/authors.toml?virtual-module` does not import the
//! file itself: the file is a *generator* whose loader computes the module's
//! content. [`engine::Session`] manages the lifecycle around that: when to
//! re-run the generator, when to re-read its dependent files, cache-busting
//! the generator after it changes, and keeping one set of watchers per
//! module.

pub mod address;
pub mod cli;
pub mod config;
pub mod content;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod generator;
pub mod host;
pub mod identity;
pub mod logging;
pub mod manifest;
pub mod types;
pub mod watch;

pub use content::{to_content_module, ModuleContent};
pub use engine::{ModuleState, ReloadHandle, Session};
pub use errors::{Result, VirtualModuleError};
pub use generator::{Generator, GeneratorImporter, GeneratorRegistry, InvocationContext, Loader, WatchResult};
pub use host::{Command, ModuleGraph, ResolvedConfig};

use std::sync::Arc;

use anyhow::bail;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{default_config_path, load_and_validate, load_or_default, ConfigFile};
use crate::host::dev::{DevHost, HostEvent};
use crate::manifest::ManifestGenerator;
use crate::types::WatchOptions;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - a generator registry (`.toml` files are manifest generators)
/// - the session and the dev host loop
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> anyhow::Result<()> {
    let cfg = match &args.config {
        Some(path) => load_and_validate(path)?,
        None => load_or_default(default_config_path())?,
    };

    if args.dry_run {
        print_dry_run(&cfg, &args.ids);
        return Ok(());
    }

    let mut registry = GeneratorRegistry::new();
    registry.register_extension("toml", ManifestGenerator::factory());

    let session = Session::new(cfg.plugin, Arc::new(registry));
    let command = if args.once { Command::Build } else { Command::Serve };
    info!(%command, modules = args.ids.len(), "starting");

    let mut host = DevHost::new(session, command, std::io::stdout());

    // Ctrl-C → graceful shutdown.
    {
        let tx = host.sender();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(HostEvent::ShutdownRequested);
        });
    }

    let report = host.run(&args.ids).await?;
    if args.once && report.failed > 0 {
        bail!("{} module(s) produced no content", report.failed);
    }
    Ok(())
}

/// Simple dry-run output: effective options and which ids are virtual.
fn print_dry_run(cfg: &ConfigFile, ids: &[String]) {
    let plugin = &cfg.plugin;
    println!("virtmod dry-run");
    println!("  plugin.name = {}", plugin.name);
    println!("  plugin.suffix = {}", plugin.suffix.as_str());
    let events: Vec<&str> = plugin.watch_events.iter().map(|e| e.as_str()).collect();
    println!("  plugin.watch_events = {:?}", events);
    if plugin.watch_options != WatchOptions::default() {
        println!("  plugin.watch_options = {:?}", plugin.watch_options);
    }
    println!();

    println!("modules ({}):", ids.len());
    for id in ids {
        if plugin.suffix.is_match(id) {
            println!("  - {id}");
            println!("      generator: {}", identity::base_path(id));
            let queries = identity::query_params(id);
            if !queries.is_empty() {
                println!("      queries: {:?}", queries);
            }
        } else {
            println!("  - {id} (not virtual, skipped)");
        }
    }

    debug!("dry-run complete (nothing produced)");
}
