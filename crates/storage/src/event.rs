// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Facts recorded to the write-ahead log.
//!
//! An event is a statement about something that happened. State is derived
//! from replaying events, never mutated directly — this keeps the WAL the
//! single source of truth for everything [`crate::state::MaterializedState`]
//! holds.

use serde::{Deserialize, Serialize};
use talus_core::{
    Code, FileSet, Image, ImageStatus, Job, JobError, JobId, JobStatus, JobResult, ImageId, Os,
    Slave, SlaveVm, Task,
};

/// A fact applied to [`crate::state::MaterializedState`] during WAL replay.
///
/// Handlers in `crate::state` must be idempotent: applying the same event
/// twice has to produce the same state as applying it once, since events
/// are replayed both at append time (for immediate visibility) and during
/// recovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    OsRegistered {
        os: Os,
    },
    ImageRegistered {
        image: Image,
    },
    ImageStatusChanged {
        id: ImageId,
        status: ImageStatus,
        now: u64,
    },
    CodeRegistered {
        code: Code,
    },
    TaskRegistered {
        task: Task,
    },
    JobCreated {
        job: Job,
    },
    JobStatusChanged {
        id: JobId,
        status: JobStatus,
        now: u64,
    },
    JobProgress {
        id: JobId,
        amount: u64,
    },
    JobErrorRecorded {
        id: JobId,
        error: JobError,
    },
    JobLogRecorded {
        id: JobId,
        log: JobError,
    },
    JobDeleted {
        id: JobId,
    },
    SlaveRegistered {
        slave: Slave,
    },
    SlaveStatusReported {
        uuid: String,
        running_vms: u64,
        total_jobs_run: u64,
        vms: Vec<SlaveVm>,
        now: u64,
    },
    SlaveHeartbeat {
        uuid: String,
        now: u64,
    },
    SlaveRemoved {
        uuid: String,
    },
    ResultRecorded {
        result: JobResult,
    },
    FileSetUpdated {
        fileset: FileSet,
    },
    /// Control event: tells the engine loop to stop consuming. Persisted so
    /// a shutdown survives a crash between append and processing — the
    /// engine is responsible for recognizing and skipping it on replay.
    Shutdown,
}
