// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operator-facing snapshot of one queue's admitted-handler ordering,
//! republished on every admission tick. Read-only: re-deriving it never
//! mutates the priority structure it describes.

use serde::{Deserialize, Serialize};
use talus_core::JobId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Master {
    pub queue: String,
    pub entries: Vec<MasterEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterEntry {
    pub job: JobId,
    pub priority: u8,
    pub drip_count: u64,
    pub remaining: Option<u64>,
}
