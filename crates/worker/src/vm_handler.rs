// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! VMHandler: provisions and tears down one VM for one job-drop unit of work
//! (§4.4.2). One handler runs per concurrent unit; the handler owns the
//! whole lifecycle from image fetch through teardown.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use talus_adapters::{build_filter_xml, DomainSpec, HypervisorAdapter, ImageManager};
use talus_bus::{Bus, PublishTarget};
use talus_core::NetworkPolicy;
use talus_wire::{ErrorPayload, GuestMessage, GuestMessageType, JobDrop, JobStatusMessage, ResultPayload};

use crate::error::VmError;
use crate::guest_comms::GuestCommsServer;

/// Shared, per-slave state every VMHandler needs — cheap to clone, cloned
/// once per spawned handler.
#[derive(Clone)]
pub struct VmContext {
    pub hypervisor: Arc<dyn HypervisorAdapter>,
    pub images: Arc<ImageManager>,
    pub comms: GuestCommsServer,
    pub bus: Arc<dyn Bus>,
    pub status_queue: String,
    pub state_dir: PathBuf,
    pub network_name: String,
    pub bridge_ip: String,
    pub code_cache_host: String,
    pub db_host: String,
    pub code_loc: String,
    pub code_username: String,
    pub code_password: String,
    pub startup_timeout: Duration,
    pub vnc_port_next: Arc<AtomicU16>,
}

/// Run one VM end to end: ensure image, snapshot disk, build config medium,
/// build network filter, create domain, poll until finished/timeout, tear
/// down. `running` is cleared by the caller to request cooperative
/// cancellation (§4.4.2 "Cancellation").
pub async fn run(ctx: VmContext, drop: JobDrop, running: Arc<AtomicBool>) -> Result<(), VmError> {
    let name = format!("{}_{}", drop.job, drop.idx);
    let work_dir = ctx.state_dir.join(&name);
    tokio::fs::create_dir_all(&work_dir).await?;

    let result = run_inner(&ctx, &drop, &name, &work_dir, &running).await;

    teardown(&ctx, &name, &work_dir).await;
    ctx.comms.unregister(drop.job, drop.idx);

    if let Err(err) = &result {
        tracing::warn!(job = %drop.job, idx = drop.idx, ?err, "vm handler failed");
        publish_error(&ctx, &drop, err).await;
    }
    result
}

async fn run_inner(
    ctx: &VmContext,
    drop: &JobDrop,
    name: &str,
    work_dir: &PathBuf,
    running: &Arc<AtomicBool>,
) -> Result<(), VmError> {
    // 1. Ensure image present.
    let base_image = ctx.images.ensure_image(&drop.image, None).await?;

    // 2. Snapshot disk: thin qcow2 overlay on top of the base image.
    let disk_path = work_dir.join("disk.qcow2");
    create_overlay(&base_image, &disk_path).await?;

    // 3. Generate config ISO.
    let cdrom_path = build_config_medium(ctx, drop, work_dir).await?;

    // 4. Build network filter.
    let filter_name = match &drop.network {
        NetworkPolicy::All => None,
        NetworkPolicy::Whitelist(hosts) => {
            let filter_name = format!("talus-whitelist-{}", drop.job);
            let mut allowed = vec![ctx.bridge_ip.clone(), ctx.code_cache_host.clone()];
            allowed.extend(hosts.iter().cloned());
            let xml = build_filter_xml(&filter_name, &allowed);
            ctx.hypervisor.define_filter(&filter_name, &xml).await?;
            Some(filter_name)
        }
    };

    // 5. Create domain.
    let spec = DomainSpec {
        name: name.to_string(),
        disk_path: disk_path.display().to_string(),
        cdrom_path: cdrom_path.display().to_string(),
        mac_address: derive_mac(drop),
        network_name: ctx.network_name.clone(),
        filter_name: filter_name.clone(),
        vnc_port: ctx.vnc_port_next.fetch_add(1, Ordering::Relaxed),
        memory_mb: 1024,
        vcpus: 1,
    };
    let handle = ctx.hypervisor.create_domain(&spec).await?;

    // 6. Boot; poll.
    let mut rx = ctx.comms.register(drop.job, drop.idx);
    let started_at = Instant::now();
    let mut started = false;
    let vm_max = Duration::from_secs(drop.vm_max);

    loop {
        if !running.load(Ordering::SeqCst) {
            return Err(VmError::Cancelled);
        }
        if started_at.elapsed() >= vm_max {
            return Err(VmError::WallClockExceeded(drop.vm_max));
        }
        if !started && started_at.elapsed() >= ctx.startup_timeout {
            return Err(VmError::StartupTimeout(ctx.startup_timeout));
        }

        let tick = tokio::time::sleep(Duration::from_secs(5));
        tokio::select! {
            _ = tick => {
                if !ctx.hypervisor.is_running(&handle).await? && started {
                    return Err(VmError::Hypervisor(talus_adapters::AdapterError::NotFound(name.to_string())));
                }
            }
            msg = rx.recv() => {
                let Some(msg) = msg else { continue };
                match msg.kind {
                    GuestMessageType::Started => started = true,
                    GuestMessageType::Finished => return Ok(()),
                    GuestMessageType::Progress => publish_progress(ctx, &msg).await,
                    GuestMessageType::Result => publish_result(ctx, &msg).await,
                    GuestMessageType::Error => publish_error_message(ctx, &msg).await,
                    GuestMessageType::Logs => publish_log(ctx, &msg).await,
                }
            }
        }
    }
}

async fn create_overlay(base_image: &std::path::Path, overlay_path: &std::path::Path) -> Result<(), VmError> {
    let status = tokio::process::Command::new("qemu-img")
        .args([
            "create",
            "-f",
            "qcow2",
            "-F",
            "qcow2",
            "-b",
            &base_image.display().to_string(),
            &overlay_path.display().to_string(),
        ])
        .status()
        .await?;
    if !status.success() {
        return Err(VmError::Io(std::io::Error::other(format!(
            "qemu-img create exited with {status}"
        ))));
    }
    Ok(())
}

async fn build_config_medium(ctx: &VmContext, drop: &JobDrop, work_dir: &PathBuf) -> Result<PathBuf, VmError> {
    let medium_dir = work_dir.join("medium");
    tokio::fs::create_dir_all(&medium_dir).await?;

    let config = serde_json::json!({
        "id": drop.job,
        "idx": drop.idx,
        "tool": drop.tool,
        "params": drop.params,
        "fileset": drop.fileset,
        "db_host": ctx.db_host,
        "code": {
            "loc": ctx.code_loc,
            "username": ctx.code_username,
            "password": ctx.code_password,
        },
        "debug": drop.debug,
    });
    tokio::fs::write(medium_dir.join("config.json"), serde_json::to_vec_pretty(&config)?).await?;
    tokio::fs::write(
        medium_dir.join("bootstrap.sh"),
        b"#!/bin/sh\nexec talus-guest-bootstrap /mnt/config.json\n" as &[u8],
    )
    .await?;

    let iso_path = work_dir.join("config.iso");
    let status = tokio::process::Command::new("genisoimage")
        .args([
            "-o",
            &iso_path.display().to_string(),
            "-V",
            "cidata",
            "-J",
            "-r",
            &medium_dir.display().to_string(),
        ])
        .status()
        .await?;
    if !status.success() {
        return Err(VmError::Io(std::io::Error::other(format!(
            "genisoimage exited with {status}"
        ))));
    }
    Ok(iso_path)
}

/// Deterministic locally-administered MAC in the `52:54:00` QEMU range,
/// derived from the job id and unit index so repeated drops of the same
/// unit (e.g. after a crash) reuse the same address.
fn derive_mac(drop: &JobDrop) -> String {
    let mut hasher = DefaultHasher::new();
    drop.job.hash(&mut hasher);
    drop.idx.hash(&mut hasher);
    let bytes = hasher.finish().to_be_bytes();
    format!("52:54:00:{:02x}:{:02x}:{:02x}", bytes[0], bytes[1], bytes[2])
}

async fn teardown(ctx: &VmContext, name: &str, work_dir: &std::path::Path) {
    let handle = talus_adapters::DomainHandle::new(name.to_string());
    if let Err(err) = ctx.hypervisor.destroy(&handle).await {
        tracing::warn!(%name, ?err, "domain teardown failed");
    }
    let filter_name = format!("talus-whitelist-{name}");
    let _ = ctx.hypervisor.undefine_filter(&filter_name).await;
    if let Err(err) = tokio::fs::remove_dir_all(work_dir).await {
        tracing::warn!(%name, ?err, "failed to remove vm work directory");
    }
    clear_arp_entry(&ctx.bridge_ip).await;
}

/// Best-effort: drop the bridge's cached ARP/neighbor entry for the torn
/// down guest so a future VM reusing the MAC doesn't inherit a stale entry.
async fn clear_arp_entry(bridge_ip: &str) {
    let _ = tokio::process::Command::new("ip").args(["neigh", "flush", "dev", bridge_ip]).status().await;
}

async fn publish_progress(ctx: &VmContext, msg: &GuestMessage) {
    let amt = msg.data.as_u64().unwrap_or(0);
    publish_status(ctx, JobStatusMessage::Progress { job: msg.job, idx: msg.idx, tool: msg.tool.clone(), amt }).await;
}

async fn publish_result(ctx: &VmContext, msg: &GuestMessage) {
    match serde_json::from_value::<ResultPayload>(msg.data.clone()) {
        Ok(data) => {
            publish_status(ctx, JobStatusMessage::Result { job: msg.job, idx: msg.idx, tool: msg.tool.clone(), data })
                .await
        }
        Err(err) => tracing::warn!(?err, "malformed guest result payload"),
    }
}

async fn publish_error_message(ctx: &VmContext, msg: &GuestMessage) {
    match serde_json::from_value::<ErrorPayload>(msg.data.clone()) {
        Ok(data) => {
            publish_status(ctx, JobStatusMessage::Error { job: msg.job, idx: msg.idx, tool: msg.tool.clone(), data })
                .await
        }
        Err(err) => tracing::warn!(?err, "malformed guest error payload"),
    }
}

async fn publish_log(ctx: &VmContext, msg: &GuestMessage) {
    match serde_json::from_value::<ErrorPayload>(msg.data.clone()) {
        Ok(data) => {
            publish_status(ctx, JobStatusMessage::Log { job: msg.job, idx: msg.idx, tool: msg.tool.clone(), data })
                .await
        }
        Err(err) => tracing::warn!(?err, "malformed guest log payload"),
    }
}

async fn publish_error(ctx: &VmContext, drop: &JobDrop, err: &VmError) {
    let data = ErrorPayload { message: err.to_string(), backtrace: None, logs: Vec::new() };
    publish_status(
        ctx,
        JobStatusMessage::Error { job: drop.job, idx: drop.idx, tool: drop.tool.clone(), data },
    )
    .await;
}

async fn publish_status(ctx: &VmContext, msg: JobStatusMessage) {
    let body = match serde_json::to_vec(&msg) {
        Ok(body) => body,
        Err(err) => {
            tracing::warn!(?err, "failed to encode job status message");
            return;
        }
    };
    if let Err(err) = ctx.bus.publish(PublishTarget::queue(ctx.status_queue.clone()), body).await {
        tracing::warn!(?err, "failed to publish job status message");
    }
}
