// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Guest ↔ worker comms messages, carried over the length-prefixed TCP
//! framing in [`crate::wire`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use talus_core::JobId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuestMessageType {
    Started,
    Progress,
    Result,
    Error,
    Logs,
    Finished,
}

/// One frame of the guest-host comms protocol: `{job, idx, tool, type, data}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuestMessage {
    pub job: JobId,
    pub idx: u64,
    pub tool: String,
    #[serde(rename = "type")]
    pub kind: GuestMessageType,
    #[serde(default)]
    pub data: Value,
}

impl GuestMessage {
    pub fn key(&self) -> (JobId, u64) {
        (self.job, self.idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn started_message_round_trips() {
        let msg = GuestMessage {
            job: JobId::new(),
            idx: 1,
            tool: "Echo".into(),
            kind: GuestMessageType::Started,
            data: Value::Null,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"started\""));
        let back: GuestMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }
}
