// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `talus-cli job show <id>` — one job's current state, progress, and
//! errors/logs. Accepts a full id or any unique prefix of one.

use serde::Serialize;
use talus_storage::MaterializedState;

use crate::exit_error::ExitError;
use crate::output::{format_or_json, OutputFormat};

#[derive(Serialize)]
struct JobDetail {
    id: String,
    name: String,
    task: String,
    image: String,
    queue: String,
    priority: u8,
    status: String,
    status_desc: Option<String>,
    progress: u64,
    vm_max: u64,
    errors: Vec<String>,
    logs: Vec<String>,
}

pub fn show(state: &MaterializedState, id: &str, format: OutputFormat) -> anyhow::Result<()> {
    let job = state
        .get_job(id)
        .ok_or_else(|| ExitError::new(1, format!("job not found: {id}")))?;

    let detail = JobDetail {
        id: job.id.as_str().to_string(),
        name: job.name.clone(),
        task: job.task.as_str().to_string(),
        image: job.image.as_str().to_string(),
        queue: job.queue.clone(),
        priority: job.priority,
        status: job.status.name.to_string(),
        status_desc: job.status.desc.clone(),
        progress: job.progress,
        vm_max: job.vm_max,
        errors: job.errors.iter().map(|e| e.message.clone()).collect(),
        logs: job.logs.iter().map(|e| e.message.clone()).collect(),
    };

    format_or_json(format, &detail, || {
        println!("{}  {}", crate::color::header(&detail.id), detail.name);
        println!("  task:     {}", detail.task);
        println!("  image:    {}", detail.image);
        println!("  queue:    {}  priority {}", detail.queue, detail.priority);
        println!(
            "  status:   {}{}",
            detail.status,
            detail.status_desc.as_deref().map(|d| format!(" ({d})")).unwrap_or_default()
        );
        println!("  progress: {}/{}", detail.progress, detail.vm_max);

        if !detail.errors.is_empty() {
            println!("\n  errors:");
            for e in &detail.errors {
                println!("    {e}");
            }
        }
        if !detail.logs.is_empty() {
            println!("\n  logs:");
            for l in &detail.logs {
                println!("    {l}");
            }
        }
    })
}
