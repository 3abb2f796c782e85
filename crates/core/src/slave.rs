// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker-host (Slave) roster records, as seen from the controller side.

use serde::{Deserialize, Serialize};

use crate::ids::{JobId, SlaveId};

/// One VM currently tracked by a Slave, surfaced in its status broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlaveVm {
    pub job: JobId,
    pub idx: u64,
    pub tool: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vnc_port: Option<u16>,
    pub start_time: u64,
}

/// A worker host, created on its first status broadcast and updated on every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slave {
    pub id: SlaveId,
    pub uuid: String,
    pub hostname: String,
    pub ip: String,
    pub max_vms: u32,
    pub running_vms: u32,
    pub total_jobs_run: u64,
    #[serde(default)]
    pub vms: Vec<SlaveVm>,
    pub created_at: u64,
    pub updated_at: u64,
}

impl Slave {
    pub fn new(uuid: impl Into<String>, hostname: impl Into<String>, ip: impl Into<String>, now: u64) -> Self {
        Self {
            id: SlaveId::new(),
            uuid: uuid.into(),
            hostname: hostname.into(),
            ip: ip.into(),
            max_vms: 0,
            running_vms: 0,
            total_jobs_run: 0,
            vms: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Invariant: `running_vms` always equals the count of live VMs this slave reports.
    pub fn apply_status(&mut self, running_vms: u32, total_jobs_run: u64, vms: Vec<SlaveVm>, now: u64) {
        self.running_vms = running_vms;
        self.total_jobs_run = total_jobs_run;
        self.vms = vms;
        self.updated_at = now;
        debug_assert_eq!(self.running_vms as usize, self.vms.len());
    }
}
