// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operating system identity. Immutable once created.

use serde::{Deserialize, Serialize};

use crate::ids::OsId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsKind {
    Windows,
    Linux,
}

crate::simple_display! {
    OsKind {
        Windows => "windows",
        Linux => "linux",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Os {
    pub id: OsId,
    pub name: String,
    pub version: String,
    #[serde(rename = "type")]
    pub kind: OsKind,
    pub arch: String,
}

impl Os {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        kind: OsKind,
        arch: impl Into<String>,
    ) -> Self {
        Self {
            id: OsId::new(),
            name: name.into(),
            version: version.into(),
            kind,
            arch: arch.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn os_kind_displays_lowercase() {
        assert_eq!(OsKind::Linux.to_string(), "linux");
        assert_eq!(OsKind::Windows.to_string(), "windows");
    }
}
