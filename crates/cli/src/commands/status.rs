// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `talus-cli status` — per-queue job summary and slave roster, derived
//! straight from the snapshot's `jobs`/`slaves` maps (the admission engine's
//! own per-queue `Master` view only exists inside a running controller
//! process, so this recomputes an equivalent summary from what's on disk).

use std::collections::BTreeMap;

use serde::Serialize;
use talus_storage::MaterializedState;

use crate::output::{format_or_json, format_time_ago, OutputFormat};

#[derive(Serialize)]
struct StatusReport {
    queues: Vec<QueueSummary>,
    slaves: Vec<SlaveSummary>,
}

#[derive(Serialize)]
struct QueueSummary {
    queue: String,
    active: usize,
    jobs: Vec<JobSummary>,
}

#[derive(Serialize)]
struct JobSummary {
    id: String,
    name: String,
    priority: u8,
    status: String,
}

#[derive(Serialize)]
struct SlaveSummary {
    uuid: String,
    hostname: String,
    running_vms: u32,
    max_vms: u32,
    total_jobs_run: u64,
    updated_at: u64,
}

pub fn run(state: &MaterializedState, format: OutputFormat) -> anyhow::Result<()> {
    let mut by_queue: BTreeMap<&str, Vec<&talus_core::Job>> = BTreeMap::new();
    for job in state.jobs.values() {
        if !job.status.is_terminal() {
            by_queue.entry(job.queue.as_str()).or_default().push(job);
        }
    }

    let queues: Vec<QueueSummary> = by_queue
        .into_iter()
        .map(|(queue, mut jobs)| {
            jobs.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.id.as_str().cmp(b.id.as_str())));
            QueueSummary {
                queue: queue.to_string(),
                active: jobs.len(),
                jobs: jobs
                    .iter()
                    .map(|j| JobSummary {
                        id: j.id.short(8).to_string(),
                        name: j.name.clone(),
                        priority: j.priority,
                        status: j.status.name.to_string(),
                    })
                    .collect(),
            }
        })
        .collect();

    let mut slaves: Vec<SlaveSummary> = state
        .slaves
        .values()
        .map(|s| SlaveSummary {
            uuid: s.uuid.clone(),
            hostname: s.hostname.clone(),
            running_vms: s.running_vms,
            max_vms: s.max_vms,
            total_jobs_run: s.total_jobs_run,
            updated_at: s.updated_at,
        })
        .collect();
    slaves.sort_by(|a, b| a.hostname.cmp(&b.hostname));

    let report = StatusReport { queues, slaves };

    format_or_json(format, &report, || {
        if report.queues.is_empty() {
            println!("No active jobs in any queue");
        }
        for queue in &report.queues {
            println!("\n{} ({} active)", crate::color::header(&queue.queue), queue.active);
            for job in &queue.jobs {
                println!(
                    "  {}  {:<5}  {:<10}  {}",
                    crate::color::literal(&job.id),
                    job.priority,
                    job.status,
                    crate::color::context(&job.name),
                );
            }
        }

        println!("\n{} ({} known)", crate::color::header("slaves"), report.slaves.len());
        if report.slaves.is_empty() {
            println!("  none");
        }
        for slave in &report.slaves {
            println!(
                "  {}  {:<20}  {}/{} vms  {} jobs run  seen {}",
                crate::color::literal(&slave.uuid[..slave.uuid.len().min(8)]),
                slave.hostname,
                slave.running_vms,
                slave.max_vms,
                slave.total_jobs_run,
                format_time_ago(slave.updated_at),
            );
        }
    })
}
