// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker (slave) lifecycle event handlers.

use super::MaterializedState;
use crate::event::DomainEvent;

pub(crate) fn apply(state: &mut MaterializedState, event: &DomainEvent) {
    match event {
        DomainEvent::SlaveRegistered { slave } => {
            state.slaves.insert(slave.uuid.clone(), slave.clone());
        }

        DomainEvent::SlaveStatusReported {
            uuid,
            running_vms,
            total_jobs_run,
            vms,
            now,
        } => {
            if let Some(slave) = state.slaves.get_mut(uuid) {
                slave.apply_status(*running_vms, *total_jobs_run, vms.clone(), *now);
            }
        }

        DomainEvent::SlaveHeartbeat { uuid, now } => {
            if let Some(slave) = state.slaves.get_mut(uuid) {
                slave.updated_at = *now;
            }
        }

        DomainEvent::SlaveRemoved { uuid } => {
            state.slaves.remove(uuid);
        }

        _ => {}
    }
}
