// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hypervisor domain lifecycle, abstracted behind a trait so `talus-worker`
//! is testable without a real libvirt connection.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("image unavailable: {0}")]
    ImageUnavailable(String),
    #[error("domain failed to start: {0}")]
    DomainStartFailed(String),
    #[error("domain not found: {0}")]
    NotFound(String),
    #[error("hypervisor connection error: {0}")]
    Connection(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Opaque handle to a created domain. Carries just enough to find it again
/// (by name) and to locate its pidfile for the fast-path SIGKILL teardown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainHandle {
    pub name: String,
}

impl DomainHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Everything needed to synthesize a domain's XML description.
#[derive(Debug, Clone)]
pub struct DomainSpec {
    pub name: String,
    pub disk_path: String,
    pub cdrom_path: String,
    pub mac_address: String,
    pub network_name: String,
    pub filter_name: Option<String>,
    pub vnc_port: u16,
    pub memory_mb: u32,
    pub vcpus: u32,
}

/// Adapter for managing one hypervisor domain's lifecycle. Grounded on the
/// donor's `AgentAdapter` trait (spawn/get_state/kill/reconnect) generalized
/// to VM domains instead of agent sessions.
#[async_trait]
pub trait HypervisorAdapter: Send + Sync + 'static {
    /// Define and start a domain from a synthesized XML description.
    async fn create_domain(&self, spec: &DomainSpec) -> Result<DomainHandle, AdapterError>;

    /// Fast-path teardown: SIGKILL the hypervisor process via its pidfile
    /// rather than a graceful (and much slower) domain destroy.
    async fn destroy(&self, handle: &DomainHandle) -> Result<(), AdapterError>;

    /// Point-in-time liveness check.
    async fn is_running(&self, handle: &DomainHandle) -> Result<bool, AdapterError>;

    /// Resolve the hypervisor process id backing a domain, for signalling.
    async fn find_pid(&self, handle: &DomainHandle) -> Result<Option<u32>, AdapterError>;

    /// Define (or redefine) a network filter from its XML description, ahead
    /// of creating a domain that references it by name (§4.4.2 step 4).
    async fn define_filter(&self, name: &str, xml: &str) -> Result<(), AdapterError>;

    /// Remove a previously-defined network filter. Best-effort: callers
    /// treat a missing filter as already cleaned up.
    async fn undefine_filter(&self, name: &str) -> Result<(), AdapterError>;
}
