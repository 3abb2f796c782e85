// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Guest-host comms acceptor (§4.4.2 "Guest-host comms protocol"): one TCP
//! listener shared by every VMHandler on a worker, demultiplexing frames by
//! `(job, idx)` to whichever handler registered interest in that pair.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use talus_core::JobId;
use talus_wire::{read_message, GuestMessage};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use crate::error::WorkerError;

type Registry = Arc<Mutex<HashMap<(JobId, u64), mpsc::Sender<GuestMessage>>>>;

/// Shared TCP acceptor for guest bootstrap connections. Cheap to clone — the
/// registry is the only state, behind an `Arc`.
#[derive(Clone)]
pub struct GuestCommsServer {
    registry: Registry,
}

impl GuestCommsServer {
    /// Binds `bind_ip:port` and spawns the accept loop. Returns immediately;
    /// the loop runs for the lifetime of the returned server's last clone.
    pub async fn bind(bind_ip: &str, port: u16) -> Result<Self, WorkerError> {
        let listener = TcpListener::bind((bind_ip, port)).await?;
        let server = Self { registry: Arc::new(Mutex::new(HashMap::new())) };
        let accept_registry = Arc::clone(&server.registry);
        tokio::spawn(accept_loop(listener, accept_registry));
        Ok(server)
    }

    /// Register interest in frames for `(job, idx)`. A second registration
    /// for the same key replaces the channel a previous VMHandler owned.
    pub fn register(&self, job: JobId, idx: u64) -> mpsc::Receiver<GuestMessage> {
        let (tx, rx) = mpsc::channel(64);
        self.registry.lock().insert((job, idx), tx);
        rx
    }

    pub fn unregister(&self, job: JobId, idx: u64) {
        self.registry.lock().remove(&(job, idx));
    }
}

async fn accept_loop(listener: TcpListener, registry: Registry) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(pair) => pair,
            Err(err) => {
                tracing::warn!(?err, "guest comms accept failed");
                continue;
            }
        };
        tracing::debug!(%peer, "guest connected");
        tokio::spawn(handle_connection(stream, Arc::clone(&registry)));
    }
}

async fn handle_connection(mut stream: TcpStream, registry: Registry) {
    loop {
        let msg: GuestMessage = match read_message(&mut stream).await {
            Ok(Some(msg)) => msg,
            Ok(None) => return,
            Err(err) => {
                tracing::warn!(?err, "guest comms frame decode failed");
                return;
            }
        };
        let sender = registry.lock().get(&msg.key()).cloned();
        match sender {
            Some(sender) => {
                if sender.send(msg).await.is_err() {
                    registry.lock().remove(&msg.key());
                }
            }
            None => tracing::debug!(job = %msg.job, idx = msg.idx, "no handler registered for guest message"),
        }
    }
}
