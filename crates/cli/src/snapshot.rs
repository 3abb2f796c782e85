// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Locating and loading the controller's on-disk snapshot — the only thing
//! this CLI ever reads.

use std::path::PathBuf;

use anyhow::Context;
use talus_storage::MaterializedState;

pub fn default_snapshot_path() -> PathBuf {
    default_state_dir().join("snapshot.json")
}

fn default_state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("TALUS_STATE_DIR") {
        return PathBuf::from(dir);
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(xdg).join("talus");
    }
    std::env::var("HOME")
        .map(|home| PathBuf::from(home).join(".local/state/talus"))
        .unwrap_or_else(|_| PathBuf::from(".talus-state"))
}

pub fn load(path: &std::path::Path) -> anyhow::Result<MaterializedState> {
    let snapshot = talus_storage::load_snapshot(path)
        .with_context(|| format!("loading snapshot from {}", path.display()))?;
    match snapshot {
        Some(snapshot) => Ok(snapshot.state),
        None => anyhow::bail!(
            "no snapshot found at {} — is the controller running?",
            path.display()
        ),
    }
}
