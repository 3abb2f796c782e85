// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Turns job lifecycle facts into calls against [`JobManager`].
//!
//! Everything here is idempotent with respect to [`JobManager`]'s own state:
//! the controller's own status-change events loop back through the WAL and
//! arrive here exactly like an externally-written one, so `adopt`/
//! `begin_cancel`/`retire` all no-op cleanly on a job they've already seen.

use std::sync::Arc;

use parking_lot::Mutex;
use talus_core::JobStatusName;
use talus_storage::{DomainEvent, MaterializedState};
use tokio::sync::mpsc;

use crate::job_manager::JobManager;

pub struct JobWatcher<C: talus_core::Clock> {
    events: mpsc::Receiver<DomainEvent>,
    manager: Arc<JobManager<C>>,
}

impl<C: talus_core::Clock> JobWatcher<C> {
    pub fn new(events: mpsc::Receiver<DomainEvent>, manager: Arc<JobManager<C>>) -> Self {
        Self { events, manager }
    }

    /// Picks back up any job already sitting in a non-terminal status when
    /// the controller starts — a restart after a crash shouldn't have to
    /// wait for a fresh event to resume dripping or finish cancelling.
    pub async fn reconcile(&self, state: &Mutex<MaterializedState>) {
        let active: Vec<_> = {
            let state = state.lock();
            state.jobs.values().filter(|job| !job.is_terminal()).cloned().collect()
        };

        for job in active {
            let id = job.id;
            match job.status.name {
                JobStatusName::Cancel | JobStatusName::Cancelling => {
                    self.manager.adopt(job).await;
                    self.manager.begin_cancel(id).await;
                }
                // A job stuck mid-teardown on restart never re-enters the
                // priority queue: `handler_quota` only drips `run`/`running`
                // jobs, so `adopt` would leave it parked forever.
                JobStatusName::Stopping => {
                    if let Err(err) = self.manager.finish_job(id) {
                        tracing::warn!(%id, ?err, "failed to finish stopping job on reconcile");
                    }
                }
                _ => self.manager.adopt(job).await,
            }
        }
    }

    pub async fn run(mut self) {
        while let Some(event) = self.events.recv().await {
            self.handle(event).await;
        }
    }

    async fn handle(&self, event: DomainEvent) {
        match event {
            DomainEvent::JobCreated { job } => self.manager.adopt(job).await,
            DomainEvent::JobStatusChanged { id, status, .. } => match status.name {
                JobStatusName::Cancel => self.manager.begin_cancel(id).await,
                JobStatusName::Cancelled | JobStatusName::Finished => self.manager.retire(id),
                _ => {}
            },
            DomainEvent::JobDeleted { id } => self.manager.retire(id),
            _ => {}
        }
    }
}
