// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker-side configuration. [`WorkerConfig`] is what a binary can resolve
//! at process start (broker address, concurrency ceiling, local paths);
//! [`RuntimeConfig`] is everything the controller only tells the worker
//! after the handshake (§4.4.1), carried in the first `SlaveCommand::Config`
//! message.

use std::path::PathBuf;
use std::time::Duration;

use talus_wire::CodeCredentials;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub broker_url: String,
    pub max_vms: u32,
    pub state_dir: PathBuf,
    pub guest_bind_ip: String,
    pub guest_port: u16,
    pub startup_timeout: Duration,
    pub poll_interval: Duration,
    pub status_interval: Duration,
    pub heartbeat_interval: Duration,
}

impl WorkerConfig {
    pub fn new(broker_url: impl Into<String>, max_vms: u32, state_dir: PathBuf) -> Self {
        Self {
            broker_url: broker_url.into(),
            max_vms,
            state_dir,
            guest_bind_ip: "0.0.0.0".to_string(),
            guest_port: 55555,
            startup_timeout: Duration::from_secs(120),
            poll_interval: Duration::from_secs(5),
            status_interval: Duration::from_secs(10),
            heartbeat_interval: Duration::from_secs(30),
        }
    }

    talus_core::setters! {
        into { guest_bind_ip: String }
        set { guest_port: u16, startup_timeout: Duration, poll_interval: Duration, status_interval: Duration, heartbeat_interval: Duration }
    }
}

/// Everything delivered by the controller's `{type:"config", ...}` reply.
/// The worker may not consume the shared `jobs` queue until this arrives.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub db: String,
    pub code: CodeCredentials,
    pub image_url: String,
}
