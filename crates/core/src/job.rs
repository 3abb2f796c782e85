// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job: one user-submitted unit of orchestrated work, and its lifecycle.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::clock::Clock;
use crate::ids::{ImageId, JobId, TaskId};
use crate::network::NetworkPolicy;

/// Default queue name used when a Job does not specify one.
pub const DEFAULT_QUEUE: &str = "jobs";

/// Default drip target depth (messages) the admission loop tries to maintain per queue.
pub const DEFAULT_DRIP_SIZE: u32 = 25;

/// Priority used whenever an out-of-range or non-integer value is supplied.
pub const DEFAULT_PRIORITY: u8 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatusName {
    Run,
    Running,
    Cancel,
    Cancelling,
    Stop,
    Stopping,
    Cancelled,
    Finished,
}

crate::simple_display! {
    JobStatusName {
        Run => "run",
        Running => "running",
        Cancel => "cancel",
        Cancelling => "cancelling",
        Stop => "stop",
        Stopping => "stopping",
        Cancelled => "cancelled",
        Finished => "finished",
    }
}

impl JobStatusName {
    /// Only `run` and `cancel` may be written by an external (user/API) actor.
    /// Every other transition is driven by the controller itself.
    pub fn is_externally_writable(&self) -> bool {
        matches!(self, JobStatusName::Run | JobStatusName::Cancel)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatusName::Cancelled | JobStatusName::Finished)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    pub name: JobStatusName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
}

impl JobStatus {
    pub fn new(name: JobStatusName) -> Self {
        Self { name, desc: None }
    }

    pub fn with_desc(name: JobStatusName, desc: impl Into<String>) -> Self {
        Self {
            name,
            desc: Some(desc.into()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.name.is_terminal()
    }
}

/// One captured error or log line, attached to a Job's `errors` or `logs` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backtrace: Option<String>,
    #[serde(default)]
    pub logs: Vec<String>,
    pub at: u64,
}

impl JobError {
    pub fn new(message: impl Into<String>, at: u64) -> Self {
        Self {
            message: message.into(),
            backtrace: None,
            logs: Vec::new(),
            at,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobTimestamps {
    pub created: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub running: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished: Option<u64>,
}

/// Clamp an untrusted priority value to `[1,100]`, defaulting non-integers to
/// [`DEFAULT_PRIORITY`]. Mirrors the boundary behaviors required of every
/// externally-supplied priority (§8 boundary behaviors).
pub fn normalize_priority(value: &Value) -> u8 {
    let Some(n) = value.as_i64() else {
        return DEFAULT_PRIORITY;
    };
    n.clamp(1, 100) as u8
}

/// Configuration used to construct a new [`Job`].
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub name: String,
    pub task: TaskId,
    pub image: ImageId,
    pub params: HashMap<String, Value>,
    pub priority: u8,
    pub queue: String,
    pub limit: i64,
    pub vm_max: u64,
    pub network: NetworkPolicy,
    pub debug: bool,
    pub tags: Vec<String>,
}

pub struct JobConfigBuilder {
    name: String,
    task: TaskId,
    image: ImageId,
    params: HashMap<String, Value>,
    priority: u8,
    queue: String,
    limit: i64,
    vm_max: u64,
    network: NetworkPolicy,
    debug: bool,
    tags: Vec<String>,
}

impl JobConfig {
    pub fn builder(task: TaskId, image: ImageId) -> JobConfigBuilder {
        JobConfigBuilder {
            name: String::new(),
            task,
            image,
            params: HashMap::new(),
            priority: DEFAULT_PRIORITY,
            queue: DEFAULT_QUEUE.to_string(),
            limit: -1,
            vm_max: 3600,
            network: NetworkPolicy::All,
            debug: false,
            tags: Vec::new(),
        }
    }
}

impl JobConfigBuilder {
    crate::setters! {
        into { name: String, queue: String }
        set {
            params: HashMap<String, Value>,
            priority: u8,
            limit: i64,
            vm_max: u64,
            network: NetworkPolicy,
            debug: bool,
            tags: Vec<String>
        }
    }

    pub fn build(self) -> JobConfig {
        JobConfig {
            name: self.name,
            task: self.task,
            image: self.image,
            params: self.params,
            priority: self.priority.clamp(1, 100),
            queue: self.queue,
            limit: self.limit,
            vm_max: self.vm_max,
            network: self.network,
            debug: self.debug,
            tags: self.tags,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub name: String,
    pub task: TaskId,
    pub image: ImageId,
    pub params: HashMap<String, Value>,
    pub status: JobStatus,
    pub priority: u8,
    pub queue: String,
    pub limit: i64,
    pub progress: u64,
    pub vm_max: u64,
    pub network: NetworkPolicy,
    pub debug: bool,
    pub errors: Vec<JobError>,
    pub logs: Vec<JobError>,
    pub timestamps: JobTimestamps,
    pub tags: Vec<String>,
}

impl Job {
    pub fn new(config: JobConfig, clock: &impl Clock) -> Self {
        let now = clock.epoch_ms();
        Self {
            id: JobId::new(),
            name: config.name,
            task: config.task,
            image: config.image,
            params: config.params,
            status: JobStatus::new(JobStatusName::Run),
            priority: config.priority,
            queue: config.queue,
            limit: config.limit,
            progress: 0,
            vm_max: config.vm_max,
            network: config.network,
            debug: config.debug,
            errors: Vec::new(),
            logs: Vec::new(),
            timestamps: JobTimestamps {
                created: now,
                ..Default::default()
            },
            tags: config.tags,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn is_unbounded(&self) -> bool {
        self.limit == -1
    }

    /// Number of drops this job should contribute on one admission tick, given a
    /// per-tick cap. Always at least 1 so every active job makes progress.
    pub fn drip_quota(&self, drip_size: u32) -> u32 {
        ((drip_size as f64 * self.priority as f64 / 100.0).round() as u32).max(1)
    }

    pub fn transition(&mut self, status: JobStatus, now: u64) {
        match status.name {
            JobStatusName::Run => self.timestamps.run = Some(now),
            JobStatusName::Running => self.timestamps.running = Some(now),
            JobStatusName::Cancelled => self.timestamps.cancelled = Some(now),
            JobStatusName::Finished => self.timestamps.finished = Some(now),
            _ => {}
        }
        self.status = status;
    }

    pub fn record_progress(&mut self, amt: u64) {
        self.progress = self.progress.saturating_add(amt);
    }

    pub fn should_stop(&self) -> bool {
        !self.is_unbounded() && self.progress >= self.limit.max(0) as u64
    }
}

#[cfg(any(test, feature = "test-support"))]
crate::builder! {
    pub struct JobBuilder => Job {
        into { name: String = "job", queue: String = crate::job::DEFAULT_QUEUE }
        set {
            priority: u8 = crate::job::DEFAULT_PRIORITY,
            limit: i64 = -1,
            progress: u64 = 0,
            vm_max: u64 = 3600,
            debug: bool = false,
            errors: Vec<JobError> = Vec::new(),
            logs: Vec<JobError> = Vec::new(),
            tags: Vec<String> = Vec::new(),
            params: std::collections::HashMap<String, serde_json::Value> = Default::default(),
            network: crate::network::NetworkPolicy = crate::network::NetworkPolicy::All,
            status: JobStatus = JobStatus::new(JobStatusName::Run),
            timestamps: JobTimestamps = JobTimestamps::default()
        }
        computed {
            id: crate::ids::JobId = crate::ids::JobId::new(),
            task: crate::ids::TaskId = crate::ids::TaskId::new(),
            image: crate::ids::ImageId = crate::ids::ImageId::new()
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
