// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Drains the write-ahead log and folds every fact into shared state.
//!
//! The engine is the WAL's only reader: [`Watcher::run`] loops on
//! [`EventReader::recv`], applies each event to [`MaterializedState`], marks
//! it processed, then forwards the same event onward so
//! [`crate::job_watcher::JobWatcher`] can react to it. `MaterializedState`
//! handlers are idempotent, so it is safe for the rest of the engine to also
//! apply an event immediately at publish time for low-latency visibility —
//! the watcher's later replay of that same event is a no-op.

use std::sync::Arc;

use parking_lot::Mutex;
use talus_storage::{DomainEvent, EventReader, MaterializedState};
use tokio::sync::mpsc;

use crate::error::WatcherError;

pub struct Watcher {
    reader: EventReader,
    state: Arc<Mutex<MaterializedState>>,
    forward: mpsc::Sender<DomainEvent>,
}

impl Watcher {
    pub fn new(
        reader: EventReader,
        state: Arc<Mutex<MaterializedState>>,
        forward: mpsc::Sender<DomainEvent>,
    ) -> Self {
        Self { reader, state, forward }
    }

    /// Runs until every [`talus_storage::EventBus`] clone is dropped, or a
    /// `Shutdown` event is replayed off the WAL.
    pub async fn run(mut self) -> Result<(), WatcherError> {
        loop {
            let Some(entry) = self.reader.recv().await? else {
                return Ok(());
            };

            let is_shutdown = matches!(entry.event, DomainEvent::Shutdown);
            self.state.lock().apply_event(&entry.event);
            self.reader.mark_processed(entry.seq);

            if self.forward.send(entry.event).await.is_err() || is_shutdown {
                return Ok(());
            }
        }
    }
}
