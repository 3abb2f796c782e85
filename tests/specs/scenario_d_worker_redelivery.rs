// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A worker that crashes mid-unit nacks its delivery with `requeue: true`;
//! the dropped job unit comes back around for a second worker to pick up
//! rather than being lost.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use talus_bus::{Bus, MemoryBus, QueueOptions};
use talus_wire::JobDrop;

#[tokio::test]
async fn nacked_delivery_is_redelivered_on_requeue() {
    let bus = Arc::new(MemoryBus::new());
    bus.declare_queue("jobs", QueueOptions::default()).await.unwrap();

    let drop = JobDrop {
        job: talus_core::JobId::new(),
        idx: 0,
        debug: false,
        image: "img-1".into(),
        image_username: "root".into(),
        image_password: "toor".into(),
        os_type: "linux".into(),
        tool: "Echo".into(),
        params: serde_json::Map::new(),
        fileset: "fs-1".into(),
        network: talus_core::NetworkPolicy::All,
        vm_max: 3600,
    };
    bus.publish(talus_bus::PublishTarget::queue("jobs"), serde_json::to_vec(&drop).unwrap()).await.unwrap();
    assert_eq!(bus.depth("jobs").await.unwrap(), 1);

    let delivery_count = Arc::new(AtomicUsize::new(0));
    let crashed_once = Arc::new(std::sync::atomic::AtomicBool::new(false));

    let count = Arc::clone(&delivery_count);
    let crashed = Arc::clone(&crashed_once);
    bus.consume(
        "jobs",
        Arc::new(move |delivery: talus_bus::Delivery| {
            let count = Arc::clone(&count);
            let crashed = Arc::clone(&crashed);
            Box::pin(async move {
                count.fetch_add(1, Ordering::SeqCst);
                if !crashed.swap(true, Ordering::SeqCst) {
                    // Simulate a worker process dying before it could ack —
                    // requeue so another worker can pick the unit back up.
                    delivery.nack(true).await.unwrap();
                } else {
                    delivery.ack().await.unwrap();
                }
            })
        }),
    )
    .await
    .unwrap();

    tokio::task::yield_now().await;
    tokio::task::yield_now().await;
    tokio::task::yield_now().await;

    assert_eq!(delivery_count.load(Ordering::SeqCst), 2, "unit must be redelivered exactly once after the nack");
    assert_eq!(bus.depth("jobs").await.unwrap(), 0, "the redelivered unit should have been acked and cleared");
}
