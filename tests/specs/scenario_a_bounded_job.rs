// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A bounded job is dripped onto its queue, consumed by a simulated worker,
//! and winds down to `finished` once every dripped unit reports a result —
//! driven through the real [`Bus::consume`]/ack path rather than a direct
//! status-handler call.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use talus_bus::{Bus, MemoryBus, QueueOptions};
use talus_core::FakeClock;
use talus_engine::JobManager;
use talus_storage::DomainEvent;
use talus_wire::{JobDrop, JobStatusMessage, ResultPayload};

use crate::specs::support::{fresh_engine_parts, make_job, seed_catalog};

#[tokio::test(start_paused = true)]
async fn bounded_job_consumed_by_worker_reaches_finished() {
    let dir = tempfile::tempdir().unwrap();
    let (event_bus, state) = fresh_engine_parts(&dir);
    let fixture = seed_catalog(&state);

    let bus = Arc::new(MemoryBus::new());
    bus.declare_queue("jobs", QueueOptions::default()).await.unwrap();

    let manager = Arc::new(JobManager::new(bus.clone(), event_bus, Arc::clone(&state), FakeClock::new()));

    let job = make_job(&fixture.task, &fixture.image, 50, 3, "jobs");
    let job_id = job.id;
    state.lock().apply_event(&DomainEvent::JobCreated { job: job.clone() });
    manager.adopt(job).await;

    let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let admission_handle = tokio::spawn(Arc::clone(&manager).run_admission_loop(shutdown_rx));

    // Simulated worker: ack every drop immediately and report a result back
    // to the manager, as the real worker binary's guest-comms loop would.
    let worker_manager = Arc::clone(&manager);
    let tool_name = fixture.code.name.clone();
    bus.consume(
        "jobs",
        Arc::new(move |delivery: talus_bus::Delivery| {
            let manager = Arc::clone(&worker_manager);
            let tool = tool_name.clone();
            Box::pin(async move {
                let drop: JobDrop = serde_json::from_slice(&delivery.body).unwrap();
                delivery.ack().await.unwrap();
                manager
                    .handle_status(JobStatusMessage::Result {
                        job: drop.job,
                        idx: drop.idx,
                        tool,
                        data: ResultPayload { kind: "output".into(), data: json!({"ok": true}) },
                    })
                    .await
                    .unwrap();
            })
        }),
    )
    .await
    .unwrap();

    for _ in 0..10 {
        tokio::time::advance(Duration::from_millis(250)).await;
        tokio::task::yield_now().await;
        if !manager.has_job(job_id) {
            break;
        }
    }

    assert!(!manager.has_job(job_id), "job should have drained and retired");
    let final_status = state.lock().jobs.get(job_id.as_str()).unwrap().status.name;
    assert_eq!(final_status, talus_core::JobStatusName::Finished);

    admission_handle.abort();
}
