// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool/component source records, referenced by Task.

use serde::{Deserialize, Serialize};

use crate::ids::CodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeKind {
    Tool,
    Component,
}

crate::simple_display! {
    CodeKind {
        Tool => "tool",
        Component => "component",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Code {
    pub id: CodeId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: CodeKind,
    #[serde(default)]
    pub bases: Vec<CodeId>,
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub tags: Vec<String>,
}
