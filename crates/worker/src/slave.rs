// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Slave: the worker-host process. Announces itself, waits for the
//! controller's config handshake, then pulls job drops off the shared
//! `jobs` queue and runs one [`crate::vm_handler`] per unit, bounded by an
//! in-process semaphore of size `max_vms` (§4.4.1).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Deserialize;
use talus_adapters::{HypervisorAdapter, ImageManager};
use talus_bus::{Bus, Delivery, ExchangeKind, PublishTarget, QueueOptions};
use talus_core::{Clock, JobId, SlaveVm};
use talus_wire::{CodeCredentials, JobDrop, SlaveStatusMessage};
use tokio::sync::{oneshot, watch, Semaphore};

use crate::config::{RuntimeConfig, WorkerConfig};
use crate::error::WorkerError;
use crate::guest_comms::GuestCommsServer;
use crate::vm_handler::{self, VmContext};

const BROADCAST_EXCHANGE: &str = "talus.broadcast";
const JOBS_QUEUE: &str = "jobs";
const STATUS_QUEUE: &str = "slave_status";

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum PersonalMessage {
    Config { db: String, code: CodeCredentials, image_url: String },
    Cancel { job: JobId },
}

struct TrackedVm {
    idx: u64,
    tool: String,
    vnc_port: Option<u16>,
    start_time: u64,
    running: Arc<AtomicBool>,
}

pub struct Slave<C: Clock> {
    uuid: String,
    hostname: String,
    ip: String,
    bus: Arc<dyn Bus>,
    hypervisor: Arc<dyn HypervisorAdapter>,
    images: Arc<ImageManager>,
    comms: GuestCommsServer,
    config: WorkerConfig,
    clock: C,
    semaphore: Arc<Semaphore>,
    vms: Mutex<HashMap<JobId, Vec<TrackedVm>>>,
    total_jobs_run: AtomicU64,
    vnc_port_next: Arc<AtomicU16>,
    runtime: Mutex<Option<RuntimeConfig>>,
}

impl<C: Clock + 'static> Slave<C> {
    /// Discover identity, connect, announce, and block until the
    /// controller's config handshake arrives. Returns the ready-to-run slave.
    pub async fn announce(
        bus: Arc<dyn Bus>,
        hypervisor: Arc<dyn HypervisorAdapter>,
        images: Arc<ImageManager>,
        comms: GuestCommsServer,
        config: WorkerConfig,
        clock: C,
    ) -> Result<Arc<Self>, WorkerError> {
        let uuid = uuid::Uuid::new_v4().to_string();
        let ip = local_ip_address::local_ip().map(|ip| ip.to_string()).map_err(|e| WorkerError::IpDiscovery(e.to_string()))?;
        let hostname = hostname::get()
            .map_err(|e| WorkerError::HostnameDiscovery(e.to_string()))?
            .to_string_lossy()
            .into_owned();

        let personal_queue = format!("slaves_{uuid}");
        bus.declare_queue(&personal_queue, QueueOptions { exclusive: true, auto_delete: true, durable: false }).await?;
        bus.declare_exchange(BROADCAST_EXCHANGE, ExchangeKind::Fanout).await?;
        bus.bind_queue(BROADCAST_EXCHANGE, &personal_queue).await?;
        bus.declare_queue(JOBS_QUEUE, QueueOptions::default()).await?;
        bus.declare_queue(STATUS_QUEUE, QueueOptions::default()).await?;

        let slave = Arc::new(Self {
            uuid: uuid.clone(),
            hostname: hostname.clone(),
            ip: ip.clone(),
            bus: Arc::clone(&bus),
            hypervisor,
            images,
            comms,
            semaphore: Arc::new(Semaphore::new(config.max_vms as usize)),
            vms: Mutex::new(HashMap::new()),
            total_jobs_run: AtomicU64::new(0),
            vnc_port_next: Arc::new(AtomicU16::new(5900)),
            runtime: Mutex::new(None),
            clock,
            config,
        });

        let announce = SlaveStatusMessage::New { uuid: uuid.clone(), ip, hostname };
        slave.publish_status(announce).await?;

        let (config_tx, config_rx) = oneshot::channel();
        let config_tx = Arc::new(Mutex::new(Some(config_tx)));
        let dispatch_slave = Arc::clone(&slave);
        let handler: talus_bus::ConsumerHandler = Arc::new(move |delivery: Delivery| {
            let slave = Arc::clone(&dispatch_slave);
            let config_tx = Arc::clone(&config_tx);
            Box::pin(async move {
                slave.handle_personal_message(delivery, &config_tx).await;
            })
        });
        bus.consume(&personal_queue, handler).await?;

        let runtime = config_rx.await.map_err(|_| WorkerError::NoConfig)?;
        *slave.runtime.lock() = Some(runtime);

        Ok(slave)
    }

    async fn handle_personal_message(
        &self,
        delivery: Delivery,
        config_tx: &Mutex<Option<oneshot::Sender<RuntimeConfig>>>,
    ) {
        let parsed: Result<PersonalMessage, _> = serde_json::from_slice(&delivery.body);
        match parsed {
            Ok(PersonalMessage::Config { db, code, image_url }) => {
                if let Some(tx) = config_tx.lock().take() {
                    let _ = tx.send(RuntimeConfig { db, code, image_url });
                }
            }
            Ok(PersonalMessage::Cancel { job }) => self.cancel_job(job),
            Err(err) => tracing::warn!(?err, "malformed personal queue message"),
        }
        let _ = delivery.ack().await;
    }

    fn cancel_job(&self, job: JobId) {
        if let Some(handlers) = self.vms.lock().get(&job) {
            for vm in handlers {
                vm.running.store(false, Ordering::SeqCst);
            }
        }
    }

    /// Consume the shared `jobs` queue and run the periodic status/heartbeat
    /// loop until `shutdown` fires. Must only be called after [`Self::announce`]
    /// has returned (config already received).
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> Result<(), WorkerError> {
        let consumer_slave = Arc::clone(&self);
        let handler: talus_bus::ConsumerHandler = Arc::new(move |delivery: Delivery| {
            let slave = Arc::clone(&consumer_slave);
            Box::pin(async move {
                slave.handle_job_drop(delivery).await;
            })
        });
        self.bus.consume(JOBS_QUEUE, handler).await?;

        let mut status_ticker = tokio::time::interval(self.config.status_interval);
        let mut heartbeat_ticker = tokio::time::interval(self.config.heartbeat_interval);
        loop {
            tokio::select! {
                _ = status_ticker.tick() => {
                    if let Err(err) = self.publish_status(self.status_message()).await {
                        tracing::warn!(?err, "failed to publish status");
                    }
                }
                _ = heartbeat_ticker.tick() => {
                    let msg = SlaveStatusMessage::Heartbeat { uuid: self.uuid.clone() };
                    if let Err(err) = self.publish_status(msg).await {
                        tracing::warn!(?err, "failed to publish heartbeat");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        return Ok(());
                    }
                }
            }
        }
    }

    async fn handle_job_drop(&self, delivery: Delivery) {
        let Some(permit) = Arc::clone(&self.semaphore).try_acquire_owned().ok() else {
            // No free slot: leave the message unacked so it's redelivered,
            // possibly to a worker with room (§4.4.1).
            let _ = delivery.nack(true).await;
            return;
        };

        let drop: JobDrop = match serde_json::from_slice(&delivery.body) {
            Ok(drop) => drop,
            Err(err) => {
                tracing::warn!(?err, "malformed job drop, discarding");
                let _ = delivery.ack().await;
                return;
            }
        };

        let runtime = self.runtime.lock().clone().expect("runtime config set before consuming jobs");
        let running = Arc::new(AtomicBool::new(true));
        self.vms.lock().entry(drop.job).or_default().push(TrackedVm {
            idx: drop.idx,
            tool: drop.tool.clone(),
            vnc_port: None,
            start_time: self.clock.epoch_ms(),
            running: Arc::clone(&running),
        });

        let ctx = VmContext {
            hypervisor: Arc::clone(&self.hypervisor),
            images: Arc::clone(&self.images),
            comms: self.comms.clone(),
            bus: Arc::clone(&self.bus),
            status_queue: "job_status".to_string(),
            state_dir: self.config.state_dir.clone(),
            network_name: "talus-net".to_string(),
            bridge_ip: self.ip.clone(),
            code_cache_host: host_of(&runtime.code.loc),
            db_host: runtime.db.clone(),
            code_loc: runtime.code.loc.clone(),
            code_username: runtime.code.username.clone(),
            code_password: runtime.code.password.clone(),
            startup_timeout: self.config.startup_timeout,
            vnc_port_next: Arc::clone(&self.vnc_port_next),
        };

        let job = drop.job;
        let idx = drop.idx;
        let result = vm_handler::run(ctx, drop, running).await;
        drop_permit(permit);

        self.total_jobs_run.fetch_add(1, Ordering::Relaxed);
        if let Some(handlers) = self.vms.lock().get_mut(&job) {
            handlers.retain(|vm| vm.idx != idx);
        }
        self.vms.lock().retain(|_, handlers| !handlers.is_empty());

        // The delivery stays unacked through the whole VM lifecycle above:
        // a worker crash mid-run leaves it on the Bus for redelivery to
        // another worker (§4.4.1, §8 invariant 3, scenario D). Only once
        // this attempt has actually concluded do we decide its fate —
        // infra-level failures are requeued, everything else is final.
        match result {
            Ok(()) => {
                let _ = delivery.ack().await;
            }
            Err(err) => {
                tracing::warn!(%job, idx, ?err, "vm handler exited with error");
                if err.is_recoverable() {
                    let _ = delivery.nack(true).await;
                } else {
                    let _ = delivery.ack().await;
                }
            }
        }
    }

    fn status_message(&self) -> SlaveStatusMessage {
        let vms = self.vms.lock();
        let running_vms = vms.values().map(|v| v.len()).sum::<usize>() as u32;
        let flattened: Vec<SlaveVm> = vms
            .iter()
            .flat_map(|(job, handlers)| {
                handlers.iter().map(move |vm| SlaveVm {
                    job: *job,
                    idx: vm.idx,
                    tool: vm.tool.clone(),
                    vnc_port: vm.vnc_port,
                    start_time: vm.start_time,
                })
            })
            .collect();
        SlaveStatusMessage::Status {
            uuid: self.uuid.clone(),
            running_vms,
            total_jobs_run: self.total_jobs_run.load(Ordering::Relaxed),
            vms: flattened,
        }
    }

    async fn publish_status(&self, msg: SlaveStatusMessage) -> Result<(), WorkerError> {
        let body = serde_json::to_vec(&msg)?;
        self.bus.publish(PublishTarget::queue(STATUS_QUEUE), body).await?;
        Ok(())
    }

    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn ip(&self) -> &str {
        &self.ip
    }
}

fn drop_permit(permit: tokio::sync::OwnedSemaphorePermit) {
    drop(permit);
}

#[cfg(test)]
#[path = "slave_tests.rs"]
mod tests;

/// Best-effort hostname extraction from a code-cache location URL, for the
/// network filter's always-allowed host list.
fn host_of(loc: &str) -> String {
    loc.trim_start_matches("https://")
        .trim_start_matches("http://")
        .split('/')
        .next()
        .unwrap_or(loc)
        .split(':')
        .next()
        .unwrap_or(loc)
        .to_string()
}
