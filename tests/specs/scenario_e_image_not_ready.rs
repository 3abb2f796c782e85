// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Adopting a job whose image hasn't finished building is an immediate
//! cancel, not an admission: no drop is ever built for it.

use std::sync::Arc;

use talus_bus::{Bus, MemoryBus, QueueOptions};
use talus_core::{FakeClock, ImageStatusName};
use talus_engine::JobManager;
use talus_storage::DomainEvent;

use crate::specs::support::{fresh_engine_parts, make_job, seed_catalog_with_image_status};

#[tokio::test]
async fn job_with_unready_image_is_cancelled_on_adopt() {
    let dir = tempfile::tempdir().unwrap();
    let (event_bus, state) = fresh_engine_parts(&dir);
    let fixture = seed_catalog_with_image_status(&state, ImageStatusName::Configuring);

    let bus = Arc::new(MemoryBus::new());
    bus.declare_queue("jobs", QueueOptions::default()).await.unwrap();

    let manager = Arc::new(JobManager::new(bus.clone(), event_bus, Arc::clone(&state), FakeClock::new()));

    let job = make_job(&fixture.task, &fixture.image, 50, -1, "jobs");
    let job_id = job.id;
    state.lock().apply_event(&DomainEvent::JobCreated { job: job.clone() });
    manager.adopt(job).await;

    assert!(!manager.has_job(job_id), "a job with an unready image must never enter the admission queue");
    assert_eq!(bus.depth("jobs").await.unwrap(), 0, "no drop should ever be built for it");

    let status = state.lock().jobs.get(job_id.as_str()).unwrap().status.clone();
    assert_eq!(status.name, talus_core::JobStatusName::Cancelled);
    assert_eq!(status.desc.as_deref(), Some("image not ready"));
}
