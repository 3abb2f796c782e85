// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Controller binary: wires `talus-storage` + `talus-bus` + `talus-engine`
//! into one process. Tails its own write-ahead log, folds it into
//! [`talus_storage::MaterializedState`], and runs the admission engine until
//! asked to stop.

mod config;
mod logging;

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use fs2::FileExt;
use parking_lot::Mutex;
use talus_bus::{AmqpBus, Bus};
use talus_core::SystemClock;
use talus_engine::Engine;
use talus_storage::{load_snapshot, Checkpointer, EventBus, MaterializedState, Wal};
use tracing::{info, warn};

use crate::config::{CliOverrides, ControllerConfig, FileConfig};

/// Talus job-orchestration controller.
#[derive(Parser, Debug)]
#[command(name = "talus-controller", version)]
struct Cli {
    /// Path to a TOML config file. Defaults to `<state-dir>/controller.toml`.
    #[arg(long)]
    config: Option<PathBuf>,

    /// AMQP broker URL (e.g. amqp://127.0.0.1:5672/%2f).
    #[arg(long)]
    amqp_url: Option<String>,

    /// Root directory for WAL, snapshot, lock file, and logs.
    #[arg(long)]
    state_dir: Option<PathBuf>,

    /// Log verbosity (`error`, `warn`, `info`, `debug`, `trace`).
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let file_config = FileConfig::load(&config_path).context("loading controller config file")?;
    let overrides = CliOverrides {
        amqp_url: cli.amqp_url,
        state_dir: cli.state_dir,
        log_level: cli.log_level,
    };
    let config = ControllerConfig::resolve(file_config, overrides);

    // `_guard` must stay alive for the process lifetime to keep the
    // non-blocking file writer flushing.
    let _guard = logging::init(&config.log_dir(), &config.log_level)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?
        .block_on(run(config))
}

async fn run(config: ControllerConfig) -> Result<()> {
    std::fs::create_dir_all(&config.state_dir).context("creating state directory")?;
    if let Some(parent) = config.wal_path().parent() {
        std::fs::create_dir_all(parent).context("creating wal directory")?;
    }

    let lock_file = acquire_lock(&config.lock_path()).context("acquiring controller lock")?;

    let (snapshot_state, processed_seq) = match load_snapshot(&config.snapshot_path())
        .context("loading snapshot")?
    {
        Some(snapshot) => {
            info!(seq = snapshot.seq, "resuming from snapshot");
            (snapshot.state, snapshot.seq)
        }
        None => (MaterializedState::default(), 0),
    };

    let wal = Wal::open(&config.wal_path(), processed_seq).context("opening wal")?;
    let (event_bus, reader) = EventBus::new(wal);
    let state = Arc::new(Mutex::new(snapshot_state));

    let bus: Arc<dyn Bus> = Arc::new(AmqpBus::new(config.amqp_url.clone()));
    let clock = SystemClock;

    info!(amqp_url = %config.amqp_url, state_dir = %config.state_dir.display(), "starting controller");
    let engine = Engine::start(Arc::clone(&bus), event_bus.clone(), reader, Arc::clone(&state), clock).await;

    let checkpointer = Checkpointer::new(config.snapshot_path());
    let checkpoint_state = Arc::clone(&state);
    let checkpoint_bus = event_bus.clone();
    let checkpoint_task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(30));
        loop {
            ticker.tick().await;
            let seq = checkpoint_bus.processed_seq();
            let snapshot = checkpoint_state.lock().clone();
            if let Err(err) = checkpointer.save(&snapshot, seq) {
                warn!(?err, "periodic checkpoint failed");
            }
        }
    });

    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    info!("shutdown requested");
    checkpoint_task.abort();

    if let Err(err) = event_bus.flush() {
        warn!(?err, "failed to flush wal on shutdown");
    }
    let seq = event_bus.processed_seq();
    let snapshot = state.lock().clone();
    if let Err(err) = Checkpointer::new(config.snapshot_path()).save(&snapshot, seq) {
        warn!(?err, "failed to save final snapshot");
    }
    drop(event_bus);

    engine.shutdown().await.context("shutting down engine")?;

    if config.lock_path().exists() {
        let _ = std::fs::remove_file(config.lock_path());
    }
    drop(lock_file);

    info!("controller shutdown complete");
    Ok(())
}

fn acquire_lock(path: &std::path::Path) -> Result<std::fs::File> {
    let mut lock_file = OpenOptions::new().write(true).create(true).truncate(false).open(path)?;
    lock_file.try_lock_exclusive().context("another controller instance is already running")?;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    Ok(lock_file)
}
