// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-queue admission ordering: a max-heap keyed on `(priority, insertion
//! order)` paired with an index for O(1) lookup-by-id.
//!
//! Cancelling a handler removes it from the index but leaves its heap key in
//! place — a stale key is simply skipped wherever the heap is read. This
//! avoids rebuilding the heap on every cancellation; [`PriorityQueue::remove`]
//! compacts the heap once stale keys pile up past a small multiple of the
//! live count.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use indexmap::IndexMap;
use talus_core::JobId;

/// Anything the admission loop can order by priority.
pub trait Prioritized {
    fn job_id(&self) -> JobId;
    fn priority(&self) -> u8;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HeapKey {
    priority: u8,
    seq: Reverse<u64>,
    job: JobId,
}

impl Ord for HeapKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.priority.cmp(&other.priority).then_with(|| self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for HeapKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

pub struct PriorityQueue<T: Prioritized> {
    heap: BinaryHeap<HeapKey>,
    entries: IndexMap<JobId, T>,
    next_seq: u64,
}

impl<T: Prioritized> Default for PriorityQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Prioritized> PriorityQueue<T> {
    pub fn new() -> Self {
        Self { heap: BinaryHeap::new(), entries: IndexMap::new(), next_seq: 0 }
    }

    pub fn insert(&mut self, item: T) {
        let job = item.job_id();
        let priority = item.priority();
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(HeapKey { priority, seq: Reverse(seq), job });
        self.entries.insert(job, item);
    }

    pub fn contains(&self, job: &JobId) -> bool {
        self.entries.contains_key(job)
    }

    pub fn get(&self, job: &JobId) -> Option<&T> {
        self.entries.get(job)
    }

    pub fn get_mut(&mut self, job: &JobId) -> Option<&mut T> {
        self.entries.get_mut(job)
    }

    pub fn remove(&mut self, job: &JobId) -> Option<T> {
        let removed = self.entries.shift_remove(job);
        if self.heap.len() > self.entries.len().saturating_mul(2) + 16 {
            self.compact();
        }
        removed
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Handler ids in admission order: highest priority first, FIFO within a
    /// priority tier. Read-only — does not disturb the underlying heap.
    pub fn ordered_job_ids(&self) -> Vec<JobId> {
        let sorted = self.heap.clone().into_sorted_vec();
        sorted
            .into_iter()
            .rev()
            .filter(|key| self.entries.contains_key(&key.job))
            .map(|key| key.job)
            .collect()
    }

    fn compact(&mut self) {
        let entries = &self.entries;
        self.heap.retain(|key| entries.contains_key(&key.job));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Item {
        job: JobId,
        priority: u8,
    }

    impl Prioritized for Item {
        fn job_id(&self) -> JobId {
            self.job
        }
        fn priority(&self) -> u8 {
            self.priority
        }
    }

    #[test]
    fn orders_by_priority_then_insertion() {
        let mut q = PriorityQueue::new();
        let low = JobId::new();
        let high = JobId::new();
        let mid = JobId::new();
        q.insert(Item { job: low, priority: 10 });
        q.insert(Item { job: high, priority: 90 });
        q.insert(Item { job: mid, priority: 50 });

        assert_eq!(q.ordered_job_ids(), vec![high, mid, low]);
    }

    #[test]
    fn fifo_within_same_priority() {
        let mut q = PriorityQueue::new();
        let first = JobId::new();
        let second = JobId::new();
        q.insert(Item { job: first, priority: 50 });
        q.insert(Item { job: second, priority: 50 });

        assert_eq!(q.ordered_job_ids(), vec![first, second]);
    }

    #[test]
    fn removed_handler_is_skipped_without_rebuild() {
        let mut q = PriorityQueue::new();
        let a = JobId::new();
        let b = JobId::new();
        q.insert(Item { job: a, priority: 50 });
        q.insert(Item { job: b, priority: 20 });

        q.remove(&a);
        assert_eq!(q.ordered_job_ids(), vec![b]);
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn compaction_keeps_heap_bounded() {
        let mut q = PriorityQueue::new();
        let survivor = JobId::new();
        q.insert(Item { job: survivor, priority: 50 });
        for _ in 0..64 {
            let id = JobId::new();
            q.insert(Item { job: id, priority: 1 });
            q.remove(&id);
        }
        assert_eq!(q.ordered_job_ids(), vec![survivor]);
        assert!(q.heap.len() < 64);
    }
}
