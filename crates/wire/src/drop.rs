// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job drop: one unit of work, controller → worker, published onto the `jobs`
//! queue (or a job-specified queue).

use serde::{Deserialize, Serialize};
use talus_core::{FileSet, JobId, NetworkPolicy};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDrop {
    pub job: JobId,
    pub idx: u64,
    #[serde(default)]
    pub debug: bool,
    pub image: String,
    pub image_username: String,
    pub image_password: String,
    pub os_type: String,
    pub tool: String,
    pub params: serde_json::Map<String, serde_json::Value>,
    pub fileset: String,
    pub network: NetworkPolicy,
    pub vm_max: u64,
}

impl JobDrop {
    /// `(job_id, idx)` pair, unique within a job — the identity invariant every
    /// drop must carry (§3 invariants).
    pub fn key(&self) -> (JobId, u64) {
        (self.job, self.idx)
    }
}

/// Helper retained for callers that only have a fileset id handy.
pub fn fileset_name(fileset: &FileSet) -> String {
    fileset.id.to_string()
}
