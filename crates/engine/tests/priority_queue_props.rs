// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Property coverage for the admission ordering structure: whatever sequence
//! of inserts and removals it sees, a read of the order must (a) be sorted
//! by priority descending and (b) never mention a removed id.

use proptest::prelude::*;
use talus_core::JobId;
use talus_engine::priority_queue::{Prioritized, PriorityQueue};

struct Handler {
    job: JobId,
    priority: u8,
}

impl Prioritized for Handler {
    fn job_id(&self) -> JobId {
        self.job
    }
    fn priority(&self) -> u8 {
        self.priority
    }
}

#[derive(Debug, Clone)]
enum Op {
    Insert(u8),
    RemoveOldest,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1u8..=100).prop_map(Op::Insert),
        Just(Op::RemoveOldest),
    ]
}

proptest! {
    #[test]
    fn ordering_and_liveness_hold_under_arbitrary_churn(ops in prop::collection::vec(op_strategy(), 0..200)) {
        let mut queue = PriorityQueue::new();
        let mut live: Vec<JobId> = Vec::new();

        for op in ops {
            match op {
                Op::Insert(priority) => {
                    let job = JobId::new();
                    queue.insert(Handler { job, priority });
                    live.push(job);
                }
                Op::RemoveOldest => {
                    if !live.is_empty() {
                        let job = live.remove(0);
                        queue.remove(&job);
                    }
                }
            }
        }

        let order = queue.ordered_job_ids();

        // Every id returned is still live.
        for id in &order {
            prop_assert!(live.contains(id));
        }
        // Every live id is returned exactly once.
        prop_assert_eq!(order.len(), live.len());

        // Priorities are non-increasing along the returned order.
        let priorities: Vec<u8> = order.iter().map(|id| queue.get(id).unwrap().priority).collect();
        for window in priorities.windows(2) {
            prop_assert!(window[0] >= window[1]);
        }
    }
}
