// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker → controller messages published onto `slave_status`.

use serde::{Deserialize, Serialize};
use talus_core::{JobId, SlaveVm};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SlaveStatusMessage {
    New {
        uuid: String,
        ip: String,
        hostname: String,
    },
    Status {
        uuid: String,
        running_vms: u32,
        total_jobs_run: u64,
        vms: Vec<SlaveVm>,
    },
    Heartbeat {
        uuid: String,
    },
}

/// Controller → slave on the slave's personal queue `slaves_<uuid>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SlaveCommand {
    Config {
        db: String,
        code: CodeCredentials,
        image_url: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeCredentials {
    pub loc: String,
    pub username: String,
    pub password: String,
}

/// Fan-out broadcast exchange message, delivered to every `slaves_<uuid>` queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BroadcastMessage {
    Cancel { job: JobId },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_message_round_trips() {
        let msg = SlaveStatusMessage::New {
            uuid: "abc".into(),
            ip: "10.0.0.1".into(),
            hostname: "host1".into(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"new\""));
        let back: SlaveStatusMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn cancel_broadcast_round_trips() {
        let job = JobId::new();
        let msg = BroadcastMessage::Cancel { job };
        let json = serde_json::to_string(&msg).unwrap();
        let back: BroadcastMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }
}
