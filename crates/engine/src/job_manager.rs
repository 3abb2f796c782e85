// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Drip-feed admission and status ingestion for active jobs.
//!
//! [`JobManager`] is the engine's single writer: every state change it makes
//! is first appended to the WAL through [`EventBus`], then applied to the
//! shared [`MaterializedState`] immediately so callers never observe a lag
//! between a decision and its visibility. The same event is folded again,
//! harmlessly, when [`crate::watcher::Watcher`] later replays it off the WAL
//! — `MaterializedState::apply_event` is idempotent by contract.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use talus_bus::{Bus, PublishTarget};
use talus_core::{
    Clock, FileSet, Job, JobError, JobId, JobResult, JobStatus, JobStatusName, DEFAULT_DRIP_SIZE,
};
use talus_storage::{DomainEvent, EventBus, MaterializedState};
use talus_wire::{BroadcastMessage, ErrorPayload, JobDrop, JobStatusMessage, ResultPayload};
use tokio::sync::watch;

use crate::error::{ControllerError, WatcherError};
use crate::job_handler::JobHandler;
use crate::master::{Master, MasterEntry};
use crate::priority_queue::PriorityQueue;

pub struct JobManager<C: Clock> {
    bus: Arc<dyn Bus>,
    event_bus: EventBus,
    state: Arc<Mutex<MaterializedState>>,
    queues: Mutex<HashMap<String, PriorityQueue<JobHandler>>>,
    job_queue: Mutex<HashMap<JobId, String>>,
    masters: Mutex<HashMap<String, Master>>,
    clock: C,
    drip_size: u32,
    broadcast_exchange: String,
}

impl<C: Clock> JobManager<C> {
    pub fn new(bus: Arc<dyn Bus>, event_bus: EventBus, state: Arc<Mutex<MaterializedState>>, clock: C) -> Self {
        Self {
            bus,
            event_bus,
            state,
            queues: Mutex::new(HashMap::new()),
            job_queue: Mutex::new(HashMap::new()),
            masters: Mutex::new(HashMap::new()),
            clock,
            drip_size: DEFAULT_DRIP_SIZE,
            broadcast_exchange: "talus.broadcast".to_string(),
        }
    }

    pub fn with_drip_size(mut self, drip_size: u32) -> Self {
        self.drip_size = drip_size;
        self
    }

    pub fn with_broadcast_exchange(mut self, name: impl Into<String>) -> Self {
        self.broadcast_exchange = name.into();
        self
    }

    pub fn has_job(&self, id: JobId) -> bool {
        self.job_queue.lock().contains_key(&id)
    }

    /// Latest admission snapshot for `queue_name`, republished every tick.
    pub fn master(&self, queue_name: &str) -> Option<Master> {
        self.masters.lock().get(queue_name).cloned()
    }

    /// Start tracking a job: stamps `run -> running`, attaches its default
    /// fileset, and inserts it into its queue's admission order. A no-op for
    /// a job already tracked or already terminal.
    pub async fn adopt(&self, job: Job) {
        if job.is_terminal() || self.has_job(job.id) {
            return;
        }

        let id = job.id;
        let queue_name = job.queue.clone();
        let now = self.clock.epoch_ms();

        let image_ready = self
            .state
            .lock()
            .images
            .get(job.image.as_str())
            .is_some_and(|image| image.status.name == talus_core::ImageStatusName::Ready);
        if !image_ready {
            if let Err(err) = self.transition_with_desc(id, JobStatusName::Cancelled, "image not ready") {
                tracing::warn!(%id, ?err, "failed to cancel job with unready image");
            }
            return;
        }

        let existing = {
            let state = self.state.lock();
            state.filesets.values().find(|fs| fs.job == Some(id)).cloned()
        };
        let fileset = match existing {
            Some(fileset) => fileset,
            None => {
                let fileset = FileSet::default_for_job(id, now);
                if let Err(err) = self.publish_fileset(fileset.clone()) {
                    tracing::warn!(%id, ?err, "failed to record default fileset");
                }
                fileset
            }
        };

        if job.status.name == JobStatusName::Run {
            if let Err(err) = self.transition(id, JobStatusName::Running) {
                tracing::warn!(%id, ?err, "failed to transition job to running");
            }
        }

        self.job_queue.lock().insert(id, queue_name.clone());
        self.queues.lock().entry(queue_name).or_default().insert(JobHandler::new(job, fileset));
    }

    /// Stop dripping and broadcast a cancel to every worker. Logged, not
    /// propagated, since the caller (the job watcher's event loop) has
    /// nowhere to report a failure to.
    pub async fn begin_cancel(&self, id: JobId) {
        if let Err(err) = self.cancel_job(id).await {
            tracing::warn!(%id, ?err, "cancel failed");
        }
    }

    async fn cancel_job(&self, id: JobId) -> Result<(), ControllerError> {
        self.remove_from_queue(id);
        self.transition(id, JobStatusName::Cancelling)?;
        let body = serde_json::to_vec(&BroadcastMessage::Cancel { job: id })?;
        self.bus.publish(PublishTarget::exchange(self.broadcast_exchange.clone()), body).await?;
        self.transition(id, JobStatusName::Cancelled)?;
        Ok(())
    }

    /// Drop local bookkeeping for a job that reached a terminal status by
    /// some other path (e.g. deletion).
    pub fn retire(&self, id: JobId) {
        self.remove_from_queue(id);
    }

    fn remove_from_queue(&self, id: JobId) {
        if let Some(queue_name) = self.job_queue.lock().remove(&id) {
            if let Some(q) = self.queues.lock().get_mut(&queue_name) {
                q.remove(&id);
            }
        }
    }

    /// Fold one worker-reported status message into durable state.
    pub async fn handle_status(&self, msg: JobStatusMessage) -> Result<(), ControllerError> {
        match msg {
            JobStatusMessage::Progress { job, amt, .. } => {
                self.record_progress(job, amt)?;
                let should_stop = self.state.lock().jobs.get(job.as_str()).is_some_and(Job::should_stop);
                if should_stop && self.has_job(job) {
                    self.finish_job(job)?;
                }
            }
            JobStatusMessage::Result { job, idx, tool, data } => {
                self.record_result(job, &tool, data)?;
                self.resolve_unit(job, idx)?;
            }
            JobStatusMessage::Error { job, idx, data, .. } => {
                self.record_error(job, data)?;
                self.resolve_unit(job, idx)?;
            }
            JobStatusMessage::Log { job, data, .. } => {
                self.record_log(job, data)?;
            }
        }
        Ok(())
    }

    /// Runs the ~5Hz drip-feed admission loop until told to stop.
    pub async fn run_admission_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(Duration::from_millis(200));
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(err) = self.admission_tick().await {
                        tracing::warn!(?err, "admission tick failed");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        return;
                    }
                }
            }
        }
    }

    async fn admission_tick(&self) -> Result<(), ControllerError> {
        let queue_names: Vec<String> = self.queues.lock().keys().cloned().collect();
        for queue_name in queue_names {
            self.drip_queue(&queue_name).await?;
        }
        Ok(())
    }

    async fn drip_queue(&self, queue_name: &str) -> Result<(), ControllerError> {
        let depth = self.bus.depth(queue_name).await?;
        if depth < self.drip_size {
            let mut room = self.drip_size - depth;
            let order = {
                let mut queues = self.queues.lock();
                queues.get_mut(queue_name).map(|q| q.ordered_job_ids()).unwrap_or_default()
            };

            for job_id in order {
                if room == 0 {
                    break;
                }
                let Some(quota) = self.handler_quota(queue_name, job_id) else {
                    continue;
                };
                let take = quota.min(room);
                let mut dropped = 0;
                for _ in 0..take {
                    if !self.drop_one(queue_name, job_id).await? {
                        break;
                    }
                    dropped += 1;
                }
                room = room.saturating_sub(dropped);
            }
        }

        self.publish_master(queue_name);
        Ok(())
    }

    /// Max units this tick should take from `job_id`'s handler: its priority
    /// share of the drip target, capped by however many units it has left.
    fn handler_quota(&self, queue_name: &str, job_id: JobId) -> Option<u32> {
        let queues = self.queues.lock();
        let handler = queues.get(queue_name)?.get(&job_id)?;
        if !matches!(handler.job.status.name, JobStatusName::Run | JobStatusName::Running) {
            return None;
        }
        let quota = u64::from(handler.job.drip_quota(self.drip_size));
        let remaining = handler.remaining().unwrap_or(u64::MAX);
        Some(quota.min(remaining).min(u64::from(u32::MAX)) as u32)
    }

    async fn drop_one(&self, queue_name: &str, job_id: JobId) -> Result<bool, ControllerError> {
        let built = {
            let mut queues = self.queues.lock();
            let Some(q) = queues.get_mut(queue_name) else { return Ok(false) };
            let Some(handler) = q.get_mut(&job_id) else { return Ok(false) };
            if !matches!(handler.job.status.name, JobStatusName::Run | JobStatusName::Running)
                || matches!(handler.remaining(), Some(0))
            {
                return Ok(false);
            }
            let idx = handler.next_idx();
            (handler.job.clone(), idx, handler.fileset.clone())
        };

        let (job, idx, fileset) = built;
        let drop = self.build_job_drop(&job, idx, &fileset)?;
        let body = serde_json::to_vec(&drop)?;
        self.bus.publish(PublishTarget::queue(queue_name), body).await?;
        Ok(true)
    }

    fn build_job_drop(&self, job: &Job, idx: u64, fileset: &FileSet) -> Result<JobDrop, ControllerError> {
        let state = self.state.lock();
        let task = state
            .tasks
            .get(job.task.as_str())
            .ok_or_else(|| ControllerError::MissingTask(job.id, job.task))?;
        let image = state
            .images
            .get(job.image.as_str())
            .ok_or_else(|| ControllerError::MissingImage(job.id, job.image))?;
        let code = state
            .codes
            .get(task.tool.as_str())
            .ok_or_else(|| ControllerError::MissingCode(job.task, task.tool))?;
        let os = state
            .oses
            .get(image.os.as_str())
            .ok_or_else(|| ControllerError::MissingOs(job.image, image.os))?;

        let mut params = serde_json::Map::new();
        for (k, v) in task.params.iter().chain(job.params.iter()) {
            params.insert(k.clone(), v.clone());
        }

        Ok(JobDrop {
            job: job.id,
            idx,
            debug: job.debug,
            image: image.id.to_string(),
            image_username: image.username.clone(),
            image_password: image.password.clone(),
            os_type: os.kind.to_string(),
            tool: code.name.clone(),
            params,
            fileset: fileset.id.to_string(),
            network: job.network.clone(),
            vm_max: job.vm_max,
        })
    }

    fn publish_master(&self, queue_name: &str) {
        let entries = {
            let queues = self.queues.lock();
            let Some(q) = queues.get(queue_name) else { return };
            q.ordered_job_ids()
                .into_iter()
                .filter_map(|id| {
                    let handler = q.get(&id)?;
                    Some(MasterEntry {
                        job: id,
                        priority: handler.job.priority,
                        drip_count: handler.drip_count,
                        remaining: handler.remaining(),
                    })
                })
                .collect()
        };
        self.masters.lock().insert(queue_name.to_string(), Master { queue: queue_name.to_string(), entries });
    }

    fn resolve_unit(&self, id: JobId, idx: u64) -> Result<(), ControllerError> {
        let drained = {
            let Some(queue_name) = self.job_queue.lock().get(&id).cloned() else { return Ok(()) };
            let mut queues = self.queues.lock();
            let Some(q) = queues.get_mut(&queue_name) else { return Ok(()) };
            let Some(handler) = q.get_mut(&id) else { return Ok(()) };
            handler.resolve(idx);
            handler.is_drained()
        };

        if drained {
            self.finish_job(id)?;
        }
        Ok(())
    }

    /// A bounded job that has dripped and resolved every unit it's allowed
    /// (or reached its raw progress limit) winds down through the
    /// controller-internal `stop`/`stopping` states before landing on
    /// `finished`.
    pub(crate) fn finish_job(&self, id: JobId) -> Result<(), ControllerError> {
        self.transition(id, JobStatusName::Stop)?;
        self.transition(id, JobStatusName::Stopping)?;
        self.transition(id, JobStatusName::Finished)?;
        self.remove_from_queue(id);
        Ok(())
    }

    fn transition(&self, id: JobId, name: JobStatusName) -> Result<(), ControllerError> {
        let now = self.clock.epoch_ms();
        let status = JobStatus::new(name);
        self.event_bus
            .send(DomainEvent::JobStatusChanged { id, status: status.clone(), now })
            .map_err(WatcherError::from)?;
        self.state.lock().apply_event(&DomainEvent::JobStatusChanged { id, status, now });
        Ok(())
    }

    fn transition_with_desc(
        &self,
        id: JobId,
        name: JobStatusName,
        desc: impl Into<String>,
    ) -> Result<(), ControllerError> {
        let now = self.clock.epoch_ms();
        let status = JobStatus::with_desc(name, desc);
        self.event_bus
            .send(DomainEvent::JobStatusChanged { id, status: status.clone(), now })
            .map_err(WatcherError::from)?;
        self.state.lock().apply_event(&DomainEvent::JobStatusChanged { id, status, now });
        Ok(())
    }

    fn record_progress(&self, id: JobId, amount: u64) -> Result<(), ControllerError> {
        self.event_bus.send(DomainEvent::JobProgress { id, amount }).map_err(WatcherError::from)?;
        self.state.lock().apply_event(&DomainEvent::JobProgress { id, amount });
        Ok(())
    }

    fn record_result(&self, id: JobId, tool: &str, data: ResultPayload) -> Result<(), ControllerError> {
        let now = self.clock.epoch_ms();
        let result = JobResult::new(id, data.kind, tool, data.data, now);
        self.event_bus
            .send(DomainEvent::ResultRecorded { result: result.clone() })
            .map_err(WatcherError::from)?;
        self.state.lock().apply_event(&DomainEvent::ResultRecorded { result });
        Ok(())
    }

    fn record_error(&self, id: JobId, data: ErrorPayload) -> Result<(), ControllerError> {
        let now = self.clock.epoch_ms();
        let error = JobError { message: data.message, backtrace: data.backtrace, logs: data.logs, at: now };
        self.event_bus
            .send(DomainEvent::JobErrorRecorded { id, error: error.clone() })
            .map_err(WatcherError::from)?;
        self.state.lock().apply_event(&DomainEvent::JobErrorRecorded { id, error });
        Ok(())
    }

    fn record_log(&self, id: JobId, data: ErrorPayload) -> Result<(), ControllerError> {
        let now = self.clock.epoch_ms();
        let log = JobError { message: data.message, backtrace: data.backtrace, logs: data.logs, at: now };
        self.event_bus
            .send(DomainEvent::JobLogRecorded { id, log: log.clone() })
            .map_err(WatcherError::from)?;
        self.state.lock().apply_event(&DomainEvent::JobLogRecorded { id, log });
        Ok(())
    }

    fn publish_fileset(&self, fileset: FileSet) -> Result<(), ControllerError> {
        self.event_bus
            .send(DomainEvent::FileSetUpdated { fileset: fileset.clone() })
            .map_err(WatcherError::from)?;
        self.state.lock().apply_event(&DomainEvent::FileSetUpdated { fileset });
        Ok(())
    }
}
