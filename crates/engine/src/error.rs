// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for the controller-side engine.
//!
//! [`WatcherError`] covers the WAL-replay path; it can only fail for reasons
//! that make the durable log itself untrustworthy, which is why
//! [`ControllerError::Fatal`] is the one case that should take the process
//! down rather than being logged and retried.

use talus_storage::WalError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("wal error: {0}")]
    Wal(#[from] WalError),
}

/// Errors surfaced while running the controller's job engine. Every variant
/// except [`ControllerError::Fatal`] is recoverable: the admission loop logs
/// it and continues on the next tick.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("fatal watcher error: {0}")]
    Fatal(#[from] WatcherError),

    #[error("bus error: {0}")]
    Bus(#[from] talus_bus::BusError),

    #[error(transparent)]
    Wire(#[from] talus_wire::WireError),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("job {0} references unknown task {1}")]
    MissingTask(talus_core::JobId, talus_core::TaskId),

    #[error("job {0} references unknown image {1}")]
    MissingImage(talus_core::JobId, talus_core::ImageId),

    #[error("task {0} references unknown code {1}")]
    MissingCode(talus_core::TaskId, talus_core::CodeId),

    #[error("image {0} references unknown os {1}")]
    MissingOs(talus_core::ImageId, talus_core::OsId),

    #[error("engine task panicked: {0}")]
    TaskPanicked(String),
}
