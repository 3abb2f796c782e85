// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Controller-side job engine: folds the write-ahead log into state and
//! drives the drip-feed admission loop that keeps every queue topped up.
//!
//! [`Engine`] is the thin wiring layer a binary constructs once at startup;
//! [`watcher::Watcher`], [`job_watcher::JobWatcher`], and
//! [`job_manager::JobManager`] are the three pieces it runs concurrently —
//! WAL replay, job lifecycle dispatch, and admission, respectively.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod error;
pub mod job_handler;
pub mod job_manager;
pub mod job_watcher;
pub mod master;
pub mod priority_queue;
pub mod watcher;

pub use error::{ControllerError, WatcherError};
pub use job_handler::JobHandler;
pub use job_manager::JobManager;
pub use job_watcher::JobWatcher;
pub use master::{Master, MasterEntry};
pub use priority_queue::{Prioritized, PriorityQueue};
pub use watcher::Watcher;

use std::sync::Arc;

use parking_lot::Mutex;
use talus_bus::Bus;
use talus_core::Clock;
use talus_storage::{EventBus, EventReader, MaterializedState};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Wires the watcher, job watcher, and job manager together and runs them
/// as three concurrent tasks until [`Engine::shutdown`] is called.
pub struct Engine<C: Clock> {
    manager: Arc<JobManager<C>>,
    state: Arc<Mutex<MaterializedState>>,
    watcher_task: JoinHandle<Result<(), WatcherError>>,
    job_watcher_task: JoinHandle<()>,
    admission_task: JoinHandle<()>,
    shutdown_tx: watch::Sender<bool>,
}

impl<C: Clock + 'static> Engine<C> {
    /// Spawns the watcher, job watcher, and admission loop. `reader` should
    /// come from the same [`EventBus`] the rest of the controller publishes
    /// through.
    pub async fn start(
        bus: Arc<dyn Bus>,
        event_bus: EventBus,
        reader: EventReader,
        state: Arc<Mutex<MaterializedState>>,
        clock: C,
    ) -> Self {
        let manager = Arc::new(JobManager::new(bus, event_bus, Arc::clone(&state), clock));
        let (forward_tx, forward_rx) = mpsc::channel(256);

        let watcher = Watcher::new(reader, Arc::clone(&state), forward_tx);
        let watcher_task = tokio::spawn(watcher.run());

        let job_watcher = JobWatcher::new(forward_rx, Arc::clone(&manager));
        job_watcher.reconcile(&state).await;
        let job_watcher_task = tokio::spawn(job_watcher.run());

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let admission_task = tokio::spawn(Arc::clone(&manager).run_admission_loop(shutdown_rx));

        Self { manager, state, watcher_task, job_watcher_task, admission_task, shutdown_tx }
    }

    pub fn manager(&self) -> Arc<JobManager<C>> {
        Arc::clone(&self.manager)
    }

    pub fn state(&self) -> Arc<Mutex<MaterializedState>> {
        Arc::clone(&self.state)
    }

    /// Stops the admission loop and waits for every task to finish. The
    /// watcher and job watcher tasks end on their own once every
    /// [`EventBus`] clone is dropped; callers that want a clean shutdown
    /// should drop their `EventBus` handles before calling this.
    pub async fn shutdown(self) -> Result<(), ControllerError> {
        let _ = self.shutdown_tx.send(true);
        let watcher_result = self
            .watcher_task
            .await
            .map_err(|err| ControllerError::TaskPanicked(err.to_string()))?;
        watcher_result?;
        let _ = self.job_watcher_task.await;
        let _ = self.admission_task.await;
        Ok(())
    }
}
