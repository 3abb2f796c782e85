// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared domain-level error type for invalid entity mutations.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("job {job} is already terminal ({status}); mutation rejected")]
    JobTerminal { job: String, status: String },
    #[error("unknown job id: {0}")]
    UnknownJob(String),
    #[error("unknown image id: {0}")]
    UnknownImage(String),
}
