// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task templates: the reusable shape a Job is stamped from.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::ids::{CodeId, ImageId, TaskId};
use crate::network::NetworkPolicy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub tool: CodeId,
    pub image: Option<ImageId>,
    #[serde(default)]
    pub params: HashMap<String, Value>,
    /// Number of progress units that constitute a complete run. `-1` means unbounded.
    pub limit: i64,
    pub vm_max_seconds: u64,
    #[serde(default)]
    pub network: NetworkPolicy,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Task {
    crate::setters! {
        into { name: String }
        set { limit: i64, vm_max_seconds: u64 }
        option { image: ImageId }
    }
}

#[cfg(any(test, feature = "test-support"))]
crate::builder! {
    pub struct TaskBuilder => Task {
        into { name: String = "task" }
        set {
            limit: i64 = -1,
            vm_max_seconds: u64 = 3600,
            params: std::collections::HashMap<String, serde_json::Value> = Default::default(),
            tags: Vec<String> = Vec::new(),
            network: crate::network::NetworkPolicy = crate::network::NetworkPolicy::All
        }
        option { image: crate::ids::ImageId }
        computed {
            id: crate::ids::TaskId = crate::ids::TaskId::new(),
            tool: crate::ids::CodeId = crate::ids::CodeId::new()
        }
    }
}
