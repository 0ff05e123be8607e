// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod paths;
pub mod server;
pub mod task;
pub mod transform;
pub mod types;
pub mod watch;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::cli::{BuildArgs, CliArgs, Command, ServeArgs};
use crate::config::ConfigFile;
use crate::config::loader::load_and_validate;
use crate::dag::TaskGraph;
use crate::engine::{BuildRun, BuildRunner, LogSink, ReloadSink, Runtime, RuntimeEvent};
use crate::exec::PipelineExecutor;
use crate::fs::{FileSystem, RealFileSystem};
use crate::paths::relative_str;
use crate::server::DevServer;
use crate::transform::TransformRegistry;
use crate::types::BuildMode;
use crate::watch::{WatchTable, spawn_watcher};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and graph construction
/// - full builds
/// - (for `watch` / `serve`) the file watcher, runtime and dev server
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let mode = if args.release {
        BuildMode::Release
    } else {
        BuildMode::Development
    };

    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?
        .with_mode(mode);

    match args.command {
        Command::Clean => clean(&cfg, &RealFileSystem),
        Command::Build(build_args) => build(&cfg, &build_args).await,
        Command::Watch => watch(&cfg, Arc::new(LogSink)).await,
        Command::Serve(serve_args) => serve(&cfg, &serve_args).await,
    }
}

/// Remove the destination directory. A missing directory is not an error.
pub fn clean(cfg: &ConfigFile, fs: &dyn FileSystem) -> Result<()> {
    let dest = cfg.dest_dir();
    if fs.remove_dir_all(&dest)? {
        info!(dest = %dest.display(), "removed destination directory");
    } else {
        info!(dest = %dest.display(), "destination directory already absent");
    }
    Ok(())
}

fn build_runner(cfg: &ConfigFile) -> Result<BuildRunner<PipelineExecutor>> {
    let graph = TaskGraph::from_config(cfg, &TransformRegistry::with_builtins())?;
    Ok(BuildRunner::new(
        Arc::new(graph),
        Arc::new(PipelineExecutor::default()),
    ))
}

async fn build(cfg: &ConfigFile, args: &BuildArgs) -> Result<()> {
    let runner = build_runner(cfg)?;

    if args.dry_run {
        print_dry_run(cfg, runner.graph());
        return Ok(());
    }

    if args.clean {
        clean(cfg, &RealFileSystem)?;
    }

    info!(mode = %cfg.mode(), tasks = runner.graph().len(), "starting build");
    let run = runner.run_full().await;
    finish_build(&run)
}

fn finish_build(run: &BuildRun) -> Result<()> {
    run.log_summary();
    if run.is_success() {
        return Ok(());
    }
    for failure in run.failures() {
        eprintln!("  {}: {}", failure.task, failure.error);
    }
    bail!("{} task(s) failed", run.failures().len())
}

async fn watch(cfg: &ConfigFile, sink: Arc<dyn ReloadSink>) -> Result<()> {
    let runner = build_runner(cfg)?;

    let initial = runner.run_full().await;
    initial.log_summary();
    if !initial.is_success() {
        warn!("initial build had failures; watching anyway");
    }

    let dest_rel = relative_str(cfg.root(), &cfg.dest_dir()).unwrap_or_default();
    let table = WatchTable::from_graph(runner.graph(), dest_rel)?;

    // Runtime event channel.
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    let mut watcher = spawn_watcher(cfg.root(), table, cfg.debounce(), rt_tx.clone())?;

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }
    drop(rt_tx);

    let runtime = Runtime::new(runner, rt_rx, sink);
    let result = runtime.run().await;
    watcher.stop().await;
    result?;
    Ok(())
}

async fn serve(cfg: &ConfigFile, args: &ServeArgs) -> Result<()> {
    let host = args.host.as_deref().unwrap_or(&cfg.server().host);
    let port = args.port.unwrap_or(cfg.server().port);
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid server address {host}:{port}"))?;

    let server = DevServer::new(cfg.dest_dir());
    let handle = server.spawn(addr).await?;
    println!("serving {} at http://{}", cfg.dest_dir().display(), handle.local_addr());

    let result = watch(cfg, Arc::new(server)).await;
    handle.shutdown();
    result
}

/// Print tasks and the batches they would run in.
fn print_dry_run(cfg: &ConfigFile, graph: &TaskGraph) {
    println!("assetdag dry-run ({} mode)", cfg.mode());
    println!("  dest = {}", cfg.dest_dir().display());
    println!();

    for (index, batch) in graph.batches().iter().enumerate() {
        println!("batch {index}:");
        for name in batch {
            let Some(task) = graph.task(name) else {
                continue;
            };
            println!("  - {name}");
            println!("      src: {:?}", task.sources());
            let transforms: Vec<&str> = task.transform_names().collect();
            if !transforms.is_empty() {
                println!("      transforms: {:?}", transforms);
            }
            if !task.deps().is_empty() {
                println!("      depends_on: {:?}", task.deps());
            }
            println!("      out_dir: {}", task.out_dir().display());
        }
    }
}
