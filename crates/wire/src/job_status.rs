// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker → controller progress/result/error/log messages on `job_status`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use talus_core::JobId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultPayload {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backtrace: Option<String>,
    #[serde(default)]
    pub logs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum JobStatusMessage {
    Progress {
        job: JobId,
        idx: u64,
        tool: String,
        amt: u64,
    },
    Result {
        job: JobId,
        idx: u64,
        tool: String,
        data: ResultPayload,
    },
    Error {
        job: JobId,
        idx: u64,
        tool: String,
        data: ErrorPayload,
    },
    Log {
        job: JobId,
        idx: u64,
        tool: String,
        data: ErrorPayload,
    },
}

impl JobStatusMessage {
    pub fn job(&self) -> JobId {
        match self {
            JobStatusMessage::Progress { job, .. }
            | JobStatusMessage::Result { job, .. }
            | JobStatusMessage::Error { job, .. }
            | JobStatusMessage::Log { job, .. } => *job,
        }
    }
}
