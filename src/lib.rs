// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod registry;
pub mod reload;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::engine::{RunCoordinator, TriggerOutcome};
use crate::errors::SitewatchError;
use crate::exec::ActionContext;
use crate::fs::{FileSystem, RealFileSystem};
use crate::registry::build_registry;
use crate::reload::{NoopReload, ReloadChannel, WebSocketReload};
use crate::types::ChangeEvent;
use crate::watch::{ChangeDispatcher, NotifyWatcher, WatchRuleEngine, Watcher};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - task registry and watch rules
/// - run coordinator and live reload
/// - (optional) file watcher
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let root = config_root_dir(&config_path);
    info!(root = ?root, config = ?config_path, "starting sitewatch");

    // Live reload only makes sense while watching.
    let (reload, livereload_port): (Arc<dyn ReloadChannel>, Option<u16>) =
        if cfg.livereload.enabled && !args.once {
            let ws = WebSocketReload::bind(&cfg.livereload.hostname, cfg.livereload.port)?;
            let port = ws.local_addr().port();
            (Arc::new(ws), Some(port))
        } else {
            (Arc::new(NoopReload), None)
        };

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let ctx = ActionContext {
        root: root.clone(),
        fs: Arc::clone(&fs),
        livereload_port,
    };

    let registry = Arc::new(build_registry(&cfg, &ctx)?);
    let engine = Arc::new(WatchRuleEngine::from_config(&cfg, Arc::clone(&registry))?);
    let coordinator = RunCoordinator::new(Arc::clone(&registry), reload);

    let startup = args.recipe.clone().or_else(|| cfg.config.startup.clone());
    if let Some(recipe) = startup.as_deref() {
        if !registry.has_recipe(recipe) {
            return Err(SitewatchError::UnknownRecipe(recipe.to_string()).into());
        }

        match coordinator.trigger(recipe).await {
            Ok(TriggerOutcome::Completed { runs }) => {
                info!(recipe = %recipe, runs, "startup recipe finished");
            }
            Ok(TriggerOutcome::Coalesced) => {}
            Err(err) if args.once => return Err(err.into()),
            Err(err) => error!(recipe = %recipe, error = %err, "startup recipe failed"),
        }
    } else if args.once {
        warn!("--once given but no startup recipe configured; nothing to do");
    }

    if args.once {
        return Ok(());
    }

    let (tx, rx) = mpsc::channel::<ChangeEvent>(cfg.config.channel_capacity);
    let _watcher_handle = NotifyWatcher.start(root.clone(), tx)?;

    let dispatcher = ChangeDispatcher::new(root, engine, coordinator, fs);
    if let Err(e) = dispatcher.prime().await {
        warn!(error = %e, "could not prime content hashes");
    }

    tokio::select! {
        _ = dispatcher.run(rx) => {
            info!("watcher stopped; exiting");
        }
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                eprintln!("failed to listen for Ctrl+C: {e}");
            }
            info!("Ctrl-C received; shutting down");
        }
    }

    Ok(())
}

/// Figure out a sensible project root for watching.
///
/// - If the config path has a non-empty parent (e.g. "site/Sitewatch.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Sitewatch.toml" (parent = ""),
///   we fall back to the current working directory "."
pub fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Simple dry-run output: print tasks, recipes and watch rules.
fn print_dry_run(cfg: &ConfigFile) {
    println!("sitewatch dry-run");
    if let Some(ref startup) = cfg.config.startup {
        println!("  config.startup = {startup}");
    }
    println!(
        "  livereload = {} ({}:{})",
        cfg.livereload.enabled, cfg.livereload.hostname, cfg.livereload.port
    );
    println!();

    println!("tasks ({}):", cfg.tasks().len());
    for (name, task) in cfg.tasks() {
        println!("  - {name} [{:?}]", task.kind);
        if let Some(ref cmd) = task.cmd {
            println!("      cmd: {cmd}");
        }
        for (output, source) in task.files.iter() {
            println!("      file: {source} -> {output}");
        }
        if !task.watched_paths.is_empty() {
            println!("      watched_paths: {:?}", task.watched_paths);
        }
        if let Some(ref destination) = task.destination {
            println!("      destination: {destination}");
        }
        if let Some(ref source) = task.source {
            println!("      source: {source}");
        }
        if !task.roots.is_empty() {
            println!("      roots: {:?}", task.roots);
        }
        if let Some(port) = task.port {
            println!("      port: {port}");
        }
        if let Some(ref timeout) = task.timeout {
            println!("      timeout: {timeout}");
        }
    }
    println!();

    println!("recipes ({}):", cfg.recipes().len());
    for (name, tasks) in cfg.recipes() {
        println!("  - {name}: {tasks:?}");
    }
    println!();

    println!("watch rules ({}):", cfg.watch_rules().len());
    for rule in cfg.watch_rules() {
        println!("  - {:?} -> {}", rule.files, rule.recipe);
        if !rule.exclude.is_empty() {
            println!("      exclude: {:?}", rule.exclude);
        }
        if rule.use_hash {
            println!("      use_hash: true");
        }
    }

    debug!("dry-run complete (no execution)");
}
