// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! VM image records and their lifecycle.

use serde::{Deserialize, Serialize};

use crate::ids::{ImageId, OsId};

/// An image's lifecycle state. `Ready` is the only state that may back a running job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageStatusName {
    Import,
    Create,
    Configure,
    Configuring,
    Ready,
    Delete,
}

crate::simple_display! {
    ImageStatusName {
        Import => "import",
        Create => "create",
        Configure => "configure",
        Configuring => "configuring",
        Ready => "ready",
        Delete => "delete",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageStatus {
    pub name: ImageStatusName,
}

impl ImageStatus {
    pub fn is_ready(&self) -> bool {
        self.name == ImageStatusName::Ready
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: ImageId,
    pub name: String,
    pub os: OsId,
    pub base_image: Option<ImageId>,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub status: ImageStatus,
    pub md5: Option<String>,
    pub created_at: u64,
    pub updated_at: u64,
}

impl Image {
    pub fn is_ready(&self) -> bool {
        self.status.is_ready()
    }
}
