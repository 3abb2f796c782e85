// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job lifecycle event handlers.

use super::MaterializedState;
use crate::event::DomainEvent;

pub(crate) fn apply(state: &mut MaterializedState, event: &DomainEvent) {
    match event {
        DomainEvent::JobCreated { job } => {
            state.jobs.entry(job.id.to_string()).or_insert_with(|| job.clone());
        }

        DomainEvent::JobStatusChanged { id, status, now } => {
            if let Some(job) = state.jobs.get_mut(id.as_str()) {
                // Idempotent: re-applying the same status is a no-op so
                // replay never double-stamps a timestamp field.
                if job.status.name == status.name {
                    return;
                }
                job.transition(status.clone(), *now);
            }
        }

        DomainEvent::JobProgress { id, amount } => {
            if let Some(job) = state.jobs.get_mut(id.as_str()) {
                if !job.is_terminal() {
                    job.record_progress(*amount);
                }
            }
        }

        DomainEvent::JobErrorRecorded { id, error } => {
            if let Some(job) = state.jobs.get_mut(id.as_str()) {
                job.errors.push(error.clone());
            }
        }

        DomainEvent::JobLogRecorded { id, log } => {
            if let Some(job) = state.jobs.get_mut(id.as_str()) {
                job.logs.push(log.clone());
            }
        }

        DomainEvent::JobDeleted { id } => {
            state.jobs.remove(id.as_str());
        }

        _ => {}
    }
}
