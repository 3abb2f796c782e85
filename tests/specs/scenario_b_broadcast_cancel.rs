// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cancelling a running job stops its drip feed, fans a cancel message out
//! to every worker bound to the broadcast exchange, and lands the job on
//! `cancelled`.

use std::sync::Arc;

use talus_bus::{Bus, ExchangeKind, MemoryBus, QueueOptions};
use talus_core::FakeClock;
use talus_engine::JobManager;
use talus_storage::DomainEvent;
use talus_wire::BroadcastMessage;

use crate::specs::support::{fresh_engine_parts, make_job, seed_catalog};

#[tokio::test]
async fn cancel_stops_drip_and_broadcasts_to_workers() {
    let dir = tempfile::tempdir().unwrap();
    let (event_bus, state) = fresh_engine_parts(&dir);
    let fixture = seed_catalog(&state);

    let bus = Arc::new(MemoryBus::new());
    bus.declare_queue("jobs", QueueOptions::default()).await.unwrap();
    bus.declare_exchange("talus.broadcast", ExchangeKind::Fanout).await.unwrap();
    bus.declare_queue("worker-1.broadcast", QueueOptions::default()).await.unwrap();
    bus.bind_queue("talus.broadcast", "worker-1.broadcast").await.unwrap();

    let manager = Arc::new(
        JobManager::new(bus.clone(), event_bus, Arc::clone(&state), FakeClock::new())
            .with_broadcast_exchange("talus.broadcast"),
    );

    let job = make_job(&fixture.task, &fixture.image, 50, -1, "jobs");
    let job_id = job.id;
    state.lock().apply_event(&DomainEvent::JobCreated { job: job.clone() });
    manager.adopt(job).await;
    assert!(manager.has_job(job_id));

    manager.begin_cancel(job_id).await;

    assert!(!manager.has_job(job_id), "cancelled job must drop out of the admission queue");
    let final_status = state.lock().jobs.get(job_id.as_str()).unwrap().status.clone();
    assert_eq!(final_status.name, talus_core::JobStatusName::Cancelled);

    assert_eq!(bus.depth("worker-1.broadcast").await.unwrap(), 1);
    let received = std::sync::Arc::new(tokio::sync::Mutex::new(None));
    let received_clone = Arc::clone(&received);
    bus.consume(
        "worker-1.broadcast",
        Arc::new(move |delivery: talus_bus::Delivery| {
            let received = Arc::clone(&received_clone);
            Box::pin(async move {
                let msg: BroadcastMessage = serde_json::from_slice(&delivery.body).unwrap();
                *received.lock().await = Some(msg);
                delivery.ack().await.unwrap();
            })
        }),
    )
    .await
    .unwrap();
    tokio::task::yield_now().await;

    match received.lock().await.clone() {
        Some(BroadcastMessage::Cancel { job }) => assert_eq!(job, job_id),
        other => panic!("expected a Cancel broadcast, got {other:?}"),
    }
}
