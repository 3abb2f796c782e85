// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the worker-side runtime.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("bus error: {0}")]
    Bus(#[from] talus_bus::BusError),
    #[error("wire error: {0}")]
    Wire(#[from] talus_wire::WireError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("ip discovery failed: {0}")]
    IpDiscovery(String),
    #[error("hostname discovery failed: {0}")]
    HostnameDiscovery(String),
    #[error("no config received from controller before shutdown")]
    NoConfig,
}

#[derive(Debug, Error)]
pub enum VmError {
    #[error("image error: {0}")]
    Image(#[from] talus_adapters::ImageManagerError),
    #[error("hypervisor error: {0}")]
    Hypervisor(#[from] talus_adapters::AdapterError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("guest never reported startup within {0:?}")]
    StartupTimeout(std::time::Duration),
    #[error("wall-clock budget ({0}s) exceeded")]
    WallClockExceeded(u64),
    #[error("cancelled")]
    Cancelled,
}

impl VmError {
    /// Whether the failing unit should be requeued for another worker to
    /// pick up rather than treated as this attempt's final word. Image
    /// fetch, hypervisor, and I/O failures are infra-level and may succeed
    /// elsewhere; a guest that never boots or a cancellation is specific to
    /// this attempt and isn't worth retrying.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, VmError::Image(_) | VmError::Hypervisor(_) | VmError::Io(_))
    }
}
