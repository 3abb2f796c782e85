// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized state folded from WAL replay.

mod catalog;
mod helpers;
mod jobs;
mod results;
mod slaves;

use crate::event::DomainEvent;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use talus_core::{Code, FileSet, Image, Job, JobResult, Os, Slave, Task};

/// The complete in-memory view of every collection the controller cares
/// about, derived entirely by folding [`DomainEvent`]s.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct MaterializedState {
    pub oses: HashMap<String, Os>,
    pub images: HashMap<String, Image>,
    pub codes: HashMap<String, Code>,
    pub tasks: HashMap<String, Task>,
    pub jobs: HashMap<String, Job>,
    pub slaves: HashMap<String, Slave>,
    pub results: HashMap<String, JobResult>,
    pub filesets: HashMap<String, FileSet>,
}

impl MaterializedState {
    /// Look up a job by id or unique prefix.
    pub fn get_job(&self, id: &str) -> Option<&Job> {
        helpers::find_by_prefix(&self.jobs, id)
    }

    pub fn get_image(&self, id: &str) -> Option<&Image> {
        helpers::find_by_prefix(&self.images, id)
    }

    pub fn get_slave(&self, uuid: &str) -> Option<&Slave> {
        self.slaves.get(uuid)
    }

    /// Jobs currently sitting in `Run`/`Running`, ordered for a given queue.
    pub fn active_jobs_in_queue<'a>(&'a self, queue: &'a str) -> impl Iterator<Item = &'a Job> {
        self.jobs
            .values()
            .filter(move |j| j.queue == queue && !j.is_terminal())
    }

    /// Apply one event, mutating state in place.
    ///
    /// Every handler must be idempotent: replaying the same event twice has
    /// to leave state identical to replaying it once, since events are
    /// folded both at publish time and again during WAL recovery.
    pub fn apply_event(&mut self, event: &DomainEvent) {
        match event {
            DomainEvent::OsRegistered { .. }
            | DomainEvent::ImageRegistered { .. }
            | DomainEvent::ImageStatusChanged { .. }
            | DomainEvent::CodeRegistered { .. }
            | DomainEvent::TaskRegistered { .. } => catalog::apply(self, event),

            DomainEvent::JobCreated { .. }
            | DomainEvent::JobStatusChanged { .. }
            | DomainEvent::JobProgress { .. }
            | DomainEvent::JobErrorRecorded { .. }
            | DomainEvent::JobLogRecorded { .. }
            | DomainEvent::JobDeleted { .. } => jobs::apply(self, event),

            DomainEvent::SlaveRegistered { .. }
            | DomainEvent::SlaveStatusReported { .. }
            | DomainEvent::SlaveHeartbeat { .. }
            | DomainEvent::SlaveRemoved { .. } => slaves::apply(self, event),

            DomainEvent::ResultRecorded { .. } | DomainEvent::FileSetUpdated { .. } => {
                results::apply(self, event)
            }

            DomainEvent::Shutdown => {}
        }
    }
}

#[cfg(test)]
#[path = "../state_tests.rs"]
mod tests;
