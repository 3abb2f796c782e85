// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

/// Proptest strategies for core domain types, reused by the fuzz-style
/// invariant tests in downstream crates.
pub mod strategies {
    use crate::job::{JobStatusName, DEFAULT_PRIORITY};
    use proptest::prelude::*;

    pub fn arb_priority_input() -> impl Strategy<Value = serde_json::Value> {
        prop_oneof![
            (i64::MIN..=i64::MAX).prop_map(|n| serde_json::json!(n)),
            Just(serde_json::Value::Null),
            ".*".prop_map(serde_json::Value::String),
        ]
    }

    pub fn arb_valid_priority() -> impl Strategy<Value = u8> {
        1u8..=100u8
    }

    pub fn arb_job_status_name() -> impl Strategy<Value = JobStatusName> {
        prop_oneof![
            Just(JobStatusName::Run),
            Just(JobStatusName::Running),
            Just(JobStatusName::Cancel),
            Just(JobStatusName::Cancelling),
            Just(JobStatusName::Stop),
            Just(JobStatusName::Stopping),
            Just(JobStatusName::Cancelled),
            Just(JobStatusName::Finished),
        ]
    }

    pub fn default_priority() -> u8 {
        DEFAULT_PRIORITY
    }
}
