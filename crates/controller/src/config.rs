// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Layered controller configuration: compiled-in defaults, then an optional
//! TOML file, then `TALUS_*` environment variables, then CLI flags — each
//! layer only overrides what it actually sets.

use std::path::PathBuf;

use serde::Deserialize;

const DEFAULT_AMQP_URL: &str = "amqp://127.0.0.1:5672/%2f";

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub amqp_url: String,
    pub state_dir: PathBuf,
    pub log_level: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            amqp_url: DEFAULT_AMQP_URL.to_string(),
            state_dir: default_state_dir(),
            log_level: "info".to_string(),
        }
    }
}

impl ControllerConfig {
    talus_core::setters! {
        into { amqp_url: String, log_level: String }
        set { state_dir: PathBuf }
    }

    pub fn wal_path(&self) -> PathBuf {
        self.state_dir.join("wal").join("events.wal")
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.state_dir.join("snapshot.json")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.state_dir.join("controller.pid")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.state_dir.join("logs")
    }

    /// Build the effective config: defaults, overridden by `file` (if given),
    /// overridden by `TALUS_*` env vars, overridden by explicit CLI flags.
    pub fn resolve(file: Option<FileConfig>, cli: CliOverrides) -> Self {
        let mut config = Self::default();

        if let Some(file) = file {
            if let Some(v) = file.amqp_url {
                config = config.amqp_url(v);
            }
            if let Some(v) = file.state_dir {
                config = config.state_dir(v);
            }
            if let Some(v) = file.log_level {
                config = config.log_level(v);
            }
        }

        if let Ok(v) = std::env::var("TALUS_AMQP_URL") {
            config = config.amqp_url(v);
        }
        if let Ok(v) = std::env::var("TALUS_STATE_DIR") {
            config = config.state_dir(PathBuf::from(v));
        }
        if let Ok(v) = std::env::var("TALUS_LOG_LEVEL") {
            config = config.log_level(v);
        }

        if let Some(v) = cli.amqp_url {
            config = config.amqp_url(v);
        }
        if let Some(v) = cli.state_dir {
            config = config.state_dir(v);
        }
        if let Some(v) = cli.log_level {
            config = config.log_level(v);
        }

        config
    }
}

/// Shape of the optional TOML config file. Every field is optional so a file
/// can override just one setting.
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub amqp_url: Option<String>,
    pub state_dir: Option<PathBuf>,
    pub log_level: Option<String>,
}

impl FileConfig {
    pub fn load(path: &std::path::Path) -> anyhow::Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(path)?;
        Ok(Some(toml::from_str(&text)?))
    }
}

/// Flags explicitly passed on the command line; `None` means "not set, fall
/// through to the next layer".
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub amqp_url: Option<String>,
    pub state_dir: Option<PathBuf>,
    pub log_level: Option<String>,
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

pub fn default_config_path() -> PathBuf {
    default_state_dir().join("controller.toml")
}
