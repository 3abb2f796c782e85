// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot schema migration.
//!
//! Snapshots are versioned so a running controller can load a snapshot
//! written by an older build. Migrations are applied in sequence against
//! the raw JSON value, before it is deserialized into
//! [`crate::state::MaterializedState`].

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("snapshot version {0} is newer than the highest supported version {1}")]
    TooNew(u32, u32),
    #[error("no migration path from version {0} to {1}")]
    NoPath(u32, u32),
    #[error("migration json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A single step that upgrades a snapshot from one schema version to the next.
pub trait Migration: Send + Sync {
    fn source_version(&self) -> u32;
    fn target_version(&self) -> u32;
    fn migrate(&self, snapshot: &mut Value) -> Result<(), MigrationError>;
}

/// Ordered set of migrations, applied one at a time until the snapshot
/// reaches the target version.
pub struct MigrationRegistry {
    pub(crate) migrations: Vec<Box<dyn Migration>>,
}

impl Default for MigrationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MigrationRegistry {
    pub fn new() -> Self {
        Self {
            migrations: Vec::new(),
        }
    }

    /// Migrate `snapshot` (expected to carry a top-level `"v"` field) up to
    /// `target_version`, applying registered migrations in sequence.
    pub fn migrate_to(&self, mut snapshot: Value, target_version: u32) -> Result<Value, MigrationError> {
        let mut current = snapshot
            .get("v")
            .and_then(Value::as_u64)
            .unwrap_or(0) as u32;

        if current > target_version {
            return Err(MigrationError::TooNew(current, target_version));
        }

        while current < target_version {
            let step = self
                .migrations
                .iter()
                .find(|m| m.source_version() == current)
                .ok_or(MigrationError::NoPath(current, target_version))?;
            step.migrate(&mut snapshot)?;
            current = step.target_version();
            if let Some(obj) = snapshot.as_object_mut() {
                obj.insert("v".into(), current.into());
            }
        }

        Ok(snapshot)
    }
}

#[cfg(test)]
#[path = "migration_tests.rs"]
mod tests;
