// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A bounded job can reach `finished` purely from `progress` accounting, with
//! no `Result` message ever published: guest sends `started`, then
//! `progress(1)`, then `finished`, and the engine has to recognize that the
//! raw progress count already met the job's limit.

use std::sync::Arc;

use talus_bus::{Bus, MemoryBus, QueueOptions};
use talus_core::FakeClock;
use talus_engine::JobManager;
use talus_storage::DomainEvent;
use talus_wire::JobStatusMessage;

use crate::specs::support::{fresh_engine_parts, make_job, seed_catalog};

#[tokio::test]
async fn progress_reaching_limit_finishes_job_without_a_result_message() {
    let dir = tempfile::tempdir().unwrap();
    let (event_bus, state) = fresh_engine_parts(&dir);
    let fixture = seed_catalog(&state);

    let bus = Arc::new(MemoryBus::new());
    bus.declare_queue("jobs", QueueOptions::default()).await.unwrap();

    let manager = Arc::new(JobManager::new(bus.clone(), event_bus, Arc::clone(&state), FakeClock::new()));

    let job = make_job(&fixture.task, &fixture.image, 50, 1, "jobs");
    let job_id = job.id;
    state.lock().apply_event(&DomainEvent::JobCreated { job: job.clone() });
    manager.adopt(job).await;
    assert!(manager.has_job(job_id));

    manager
        .handle_status(JobStatusMessage::Progress {
            job: job_id,
            idx: 0,
            tool: fixture.code.name.clone(),
            amt: 1,
        })
        .await
        .unwrap();

    assert!(!manager.has_job(job_id), "job should have drained out of the admission queue on progress alone");
    let job = state.lock().jobs.get(job_id.as_str()).unwrap().clone();
    assert_eq!(job.status.name, talus_core::JobStatusName::Finished);
    assert_eq!(job.progress, 1);
}
