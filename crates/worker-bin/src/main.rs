// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker binary: wires `talus-bus` + `talus-adapters` + `talus-worker` into
//! one process. Announces itself to the controller, waits for the config
//! handshake, then runs the shared-queue consumer and VMHandler pool until
//! asked to stop.

mod config;
mod logging;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use talus_adapters::{ImageManager, LibvirtAdapter};
use talus_bus::{AmqpBus, Bus};
use talus_core::SystemClock;
use talus_worker::{GuestCommsServer, Slave};
use tokio::sync::watch;
use tracing::info;

use crate::config::{CliOverrides, FileConfig, WorkerBinConfig};

/// Talus worker host: provisions and tears down VMs for dripped units of work.
#[derive(Parser, Debug)]
#[command(name = "talus-worker-bin", version)]
struct Cli {
    /// AMQP broker host or URL (positional, mirrors the source's bare
    /// `<AMQP_HOST>` bootstrap argument).
    broker: Option<String>,

    /// Maximum concurrent VMs (positional, mirrors the source's bare
    /// `<MAX_VMS>` bootstrap argument).
    max_vms: Option<u32>,

    /// Path to a TOML config file. Defaults to `<state-dir>/worker.toml`.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    state_dir: Option<PathBuf>,

    #[arg(long)]
    libvirt_uri: Option<String>,

    #[arg(long)]
    image_base_url: Option<String>,

    #[arg(long)]
    guest_bind_ip: Option<String>,

    #[arg(long)]
    guest_port: Option<u16>,

    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let file_config = FileConfig::load(&config_path).context("loading worker config file")?;
    let overrides = CliOverrides {
        amqp_url: cli.broker.map(|b| if b.contains("://") { b } else { format!("amqp://{b}:5672/%2f") }),
        max_vms: cli.max_vms,
        state_dir: cli.state_dir,
        libvirt_uri: cli.libvirt_uri,
        image_base_url: cli.image_base_url,
        guest_bind_ip: cli.guest_bind_ip,
        guest_port: cli.guest_port,
        log_level: cli.log_level,
    };
    let config = WorkerBinConfig::resolve(file_config, overrides)?;

    let _guard = logging::init(&config.log_dir(), &config.log_level)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?
        .block_on(run(config))
}

async fn run(config: WorkerBinConfig) -> Result<()> {
    std::fs::create_dir_all(&config.worker.state_dir).context("creating state directory")?;
    let runtime_dir = config.worker.state_dir.join("run");
    std::fs::create_dir_all(&runtime_dir).context("creating libvirt runtime directory")?;
    let image_store_dir = config.worker.state_dir.join("images");
    std::fs::create_dir_all(&image_store_dir).context("creating image store directory")?;

    let hypervisor: Arc<dyn talus_adapters::HypervisorAdapter> =
        Arc::new(LibvirtAdapter::connect(&config.libvirt_uri, runtime_dir).context("connecting to libvirt")?);
    let images = Arc::new(ImageManager::new(image_store_dir, config.image_base_url.clone()));
    let comms = GuestCommsServer::bind(&config.worker.guest_bind_ip, config.worker.guest_port)
        .await
        .context("binding guest comms listener")?;
    let bus: Arc<dyn Bus> = Arc::new(AmqpBus::new(config.worker.broker_url.clone()));
    let clock = SystemClock;

    info!(
        broker = %config.worker.broker_url,
        max_vms = config.worker.max_vms,
        "announcing worker"
    );
    let slave = Slave::announce(bus, hypervisor, images, comms, config.worker.clone(), clock)
        .await
        .context("announcing to controller")?;
    info!(uuid = slave.uuid(), hostname = slave.hostname(), ip = slave.ip(), "worker ready");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown requested");
        let _ = shutdown_tx.send(true);
    });

    slave.run(shutdown_rx).await.context("worker run loop exited with error")?;
    info!("worker shutdown complete");
    Ok(())
}
