// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Layered worker-host configuration: compiled-in defaults, then an optional
//! TOML file, then `TALUS_*` environment variables, then CLI flags (which
//! still carry the broker host and max-VM count as positional arguments,
//! same as the source's bare `<AMQP_HOST> <MAX_VMS>` bootstrap).

use std::path::PathBuf;

use serde::Deserialize;
use talus_worker::WorkerConfig;

const DEFAULT_LIBVIRT_URI: &str = "qemu:///system";

#[derive(Debug, Clone)]
pub struct WorkerBinConfig {
    pub worker: WorkerConfig,
    pub libvirt_uri: String,
    pub image_base_url: String,
    pub log_level: String,
}

impl WorkerBinConfig {
    pub fn log_dir(&self) -> PathBuf {
        self.worker.state_dir.join("logs")
    }

    pub fn resolve(file: Option<FileConfig>, cli: CliOverrides) -> anyhow::Result<Self> {
        let mut amqp_url = "amqp://127.0.0.1:5672/%2f".to_string();
        let mut max_vms: u32 = 4;
        let mut state_dir = default_state_dir();
        let mut libvirt_uri = DEFAULT_LIBVIRT_URI.to_string();
        let mut image_base_url = "http://127.0.0.1:8088/images".to_string();
        let mut guest_bind_ip = "0.0.0.0".to_string();
        let mut guest_port: u16 = 55555;
        let mut log_level = "info".to_string();

        if let Some(file) = file {
            if let Some(v) = file.amqp_url {
                amqp_url = v;
            }
            if let Some(v) = file.max_vms {
                max_vms = v;
            }
            if let Some(v) = file.state_dir {
                state_dir = v;
            }
            if let Some(v) = file.libvirt_uri {
                libvirt_uri = v;
            }
            if let Some(v) = file.image_base_url {
                image_base_url = v;
            }
            if let Some(v) = file.guest_bind_ip {
                guest_bind_ip = v;
            }
            if let Some(v) = file.guest_port {
                guest_port = v;
            }
            if let Some(v) = file.log_level {
                log_level = v;
            }
        }

        if let Ok(v) = std::env::var("TALUS_AMQP_URL") {
            amqp_url = v;
        }
        if let Ok(v) = std::env::var("TALUS_MAX_VMS") {
            max_vms = v.parse().map_err(|_| anyhow::anyhow!("TALUS_MAX_VMS must be a number"))?;
        }
        if let Ok(v) = std::env::var("TALUS_STATE_DIR") {
            state_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("TALUS_LIBVIRT_URI") {
            libvirt_uri = v;
        }
        if let Ok(v) = std::env::var("TALUS_IMAGE_BASE_URL") {
            image_base_url = v;
        }
        if let Ok(v) = std::env::var("TALUS_LOG_LEVEL") {
            log_level = v;
        }

        if let Some(v) = cli.amqp_url {
            amqp_url = v;
        }
        if let Some(v) = cli.max_vms {
            max_vms = v;
        }
        if let Some(v) = cli.state_dir {
            state_dir = v;
        }
        if let Some(v) = cli.libvirt_uri {
            libvirt_uri = v;
        }
        if let Some(v) = cli.image_base_url {
            image_base_url = v;
        }
        if let Some(v) = cli.guest_bind_ip {
            guest_bind_ip = v;
        }
        if let Some(v) = cli.guest_port {
            guest_port = v;
        }
        if let Some(v) = cli.log_level {
            log_level = v;
        }

        let worker = WorkerConfig::new(amqp_url, max_vms, state_dir)
            .guest_bind_ip(guest_bind_ip)
            .guest_port(guest_port);

        Ok(Self { worker, libvirt_uri, image_base_url, log_level })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub amqp_url: Option<String>,
    pub max_vms: Option<u32>,
    pub state_dir: Option<PathBuf>,
    pub libvirt_uri: Option<String>,
    pub image_base_url: Option<String>,
    pub guest_bind_ip: Option<String>,
    pub guest_port: Option<u16>,
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

#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub amqp_url: Option<String>,
    pub max_vms: Option<u32>,
    pub state_dir: Option<PathBuf>,
    pub libvirt_uri: Option<String>,
    pub image_base_url: Option<String>,
    pub guest_bind_ip: Option<String>,
    pub guest_port: Option<u16>,
    pub log_level: Option<String>,
}

fn default_state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("TALUS_STATE_DIR") {
        return PathBuf::from(dir);
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(xdg).join("talus-worker");
    }
    std::env::var("HOME")
        .map(|home| PathBuf::from(home).join(".local/state/talus-worker"))
        .unwrap_or_else(|_| PathBuf::from(".talus-worker-state"))
}

pub fn default_config_path() -> PathBuf {
    default_state_dir().join("worker.toml")
}
