// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only result documents emitted by a tool run.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{JobId, ResultId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub id: ResultId,
    pub job: JobId,
    #[serde(rename = "type")]
    pub kind: String,
    pub tool: String,
    pub data: Value,
    pub created: u64,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl JobResult {
    pub fn new(job: JobId, kind: impl Into<String>, tool: impl Into<String>, data: Value, created: u64) -> Self {
        Self {
            id: ResultId::new(),
            job,
            kind: kind.into(),
            tool: tool.into(),
            data,
            created,
            tags: Vec::new(),
        }
    }
}
