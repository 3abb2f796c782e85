// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process event bus for the controller.
//!
//! The bus writes events to the WAL before waking the engine, so a crash
//! between append and processing never loses a fact: replay on restart
//! picks up exactly where the WAL left off. Events are buffered in memory
//! and periodically flushed (group commit, ~10ms durability window).

use crate::event::DomainEvent;
use crate::wal::{Wal, WalEntry, WalError};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Handle for publishing events. Cheap to clone; all clones share one WAL.
#[derive(Clone)]
pub struct EventBus {
    wal: Arc<Mutex<Wal>>,
    wake_tx: mpsc::Sender<()>,
}

/// The engine's half of the bus: pulls unprocessed entries off the WAL.
pub struct EventReader {
    wal: Arc<Mutex<Wal>>,
    wake_rx: mpsc::Receiver<()>,
}

impl EventBus {
    /// Wrap a WAL with a bus/reader pair.
    pub fn new(wal: Wal) -> (Self, EventReader) {
        let wal = Arc::new(Mutex::new(wal));
        let (wake_tx, wake_rx) = mpsc::channel(1);

        (
            Self {
                wal: Arc::clone(&wal),
                wake_tx,
            },
            EventReader { wal, wake_rx },
        )
    }

    /// Append an event to the WAL (buffered, not yet durable) and wake the
    /// reader. Returns the assigned sequence number.
    pub fn send(&self, event: DomainEvent) -> Result<u64, WalError> {
        let seq = {
            let mut wal = self.wal.lock();
            wal.append(&event)?
        };
        // Non-blocking: if the channel is already full the engine is awake.
        let _ = self.wake_tx.try_send(());
        Ok(seq)
    }

    /// Force all buffered events to disk. The durability point for `send`.
    pub fn flush(&self) -> Result<(), WalError> {
        self.wal.lock().flush()
    }

    pub fn needs_flush(&self) -> bool {
        self.wal.lock().needs_flush()
    }

    pub fn processed_seq(&self) -> u64 {
        self.wal.lock().processed_seq()
    }
}

impl EventReader {
    /// Wait for and return the next unprocessed event. Returns `None` only
    /// when every `EventBus` clone has been dropped.
    pub async fn recv(&mut self) -> Result<Option<WalEntry>, WalError> {
        loop {
            {
                let mut wal = self.wal.lock();
                if let Some(entry) = wal.next_unprocessed()? {
                    return Ok(Some(entry));
                }
            }

            if self.wake_rx.recv().await.is_none() {
                return Ok(None);
            }
        }
    }

    pub fn mark_processed(&self, seq: u64) {
        self.wal.lock().mark_processed(seq);
    }

    /// Shared handle to the underlying WAL, e.g. for checkpointing.
    pub fn wal(&self) -> Arc<Mutex<Wal>> {
        Arc::clone(&self.wal)
    }
}
