// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `talus-cli slave list` — known worker hosts and their VM/throughput
//! counters.

use serde::Serialize;
use talus_storage::MaterializedState;

use crate::output::{format_or_json, format_time_ago, OutputFormat};

#[derive(Serialize)]
struct SlaveRow {
    uuid: String,
    hostname: String,
    ip: String,
    running_vms: u32,
    max_vms: u32,
    total_jobs_run: u64,
    updated_at: u64,
}

pub fn list(state: &MaterializedState, format: OutputFormat) -> anyhow::Result<()> {
    let mut rows: Vec<SlaveRow> = state
        .slaves
        .values()
        .map(|s| SlaveRow {
            uuid: s.uuid.clone(),
            hostname: s.hostname.clone(),
            ip: s.ip.clone(),
            running_vms: s.running_vms,
            max_vms: s.max_vms,
            total_jobs_run: s.total_jobs_run,
            updated_at: s.updated_at,
        })
        .collect();
    rows.sort_by(|a, b| a.hostname.cmp(&b.hostname));

    format_or_json(format, &rows, || {
        if rows.is_empty() {
            println!("No slaves known");
            return;
        }
        for row in &rows {
            println!(
                "{}  {:<20}  {:<15}  {}/{} vms  {} jobs run  seen {}",
                crate::color::literal(&row.uuid[..row.uuid.len().min(8)]),
                row.hostname,
                row.ip,
                row.running_vms,
                row.max_vms,
                row.total_jobs_run,
                format_time_ago(row.updated_at),
            );
        }
    })
}
