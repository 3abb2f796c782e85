// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic snapshotting so recovery doesn't have to replay the whole WAL.

use crate::migration::MigrationRegistry;
use crate::snapshot::{Snapshot, SnapshotError, CURRENT_SNAPSHOT_VERSION};
use crate::state::MaterializedState;
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};

/// Writes and loads snapshots atomically (write to a temp file, then rename).
pub struct Checkpointer {
    path: PathBuf,
}

impl Checkpointer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Persist `state` tagged with the WAL sequence it reflects.
    pub fn save(&self, state: &MaterializedState, seq: u64) -> Result<(), SnapshotError> {
        let snapshot = Snapshot {
            version: CURRENT_SNAPSHOT_VERSION,
            seq,
            state: state.clone(),
            created_at: Utc::now(),
        };

        let tmp_path = self.path.with_extension("tmp");
        let bytes = serde_json::to_vec(&snapshot)?;
        fs::write(&tmp_path, bytes)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

/// Load a snapshot from `path`, migrating it to [`CURRENT_SNAPSHOT_VERSION`]
/// if it was written by an older build. Returns `None` if no snapshot exists.
pub fn load_snapshot(path: &Path) -> Result<Option<Snapshot>, SnapshotError> {
    if !path.exists() {
        return Ok(None);
    }

    let bytes = fs::read(path)?;
    let raw: serde_json::Value = serde_json::from_slice(&bytes)?;

    let registry = MigrationRegistry::new();
    let migrated = registry.migrate_to(raw, CURRENT_SNAPSHOT_VERSION)?;
    let snapshot: Snapshot = serde_json::from_value(migrated)?;
    Ok(Some(snapshot))
}
