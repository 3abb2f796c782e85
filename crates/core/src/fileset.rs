// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File sets: the files a tool run emits, grouped per job.

use serde::{Deserialize, Serialize};

use crate::ids::{FileSetId, JobId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRef {
    pub name: String,
    pub path: String,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md5: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSet {
    pub id: FileSetId,
    pub name: String,
    #[serde(default)]
    pub files: Vec<FileRef>,
    pub job: Option<JobId>,
    pub created_at: u64,
    pub updated_at: u64,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl FileSet {
    pub fn default_for_job(job: JobId, now: u64) -> Self {
        Self {
            id: FileSetId::new(),
            name: "default".to_string(),
            files: Vec::new(),
            job: Some(job),
            created_at: now,
            updated_at: now,
            tags: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn push(&mut self, file: FileRef, now: u64) {
        self.files.push(file);
        self.updated_at = now;
    }
}
