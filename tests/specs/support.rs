// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for the workspace-level scenario tests: a catalog seeded
//! into a fresh [`MaterializedState`], and a job builder against it.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use talus_core::{
    Code, CodeKind, Image, ImageStatus, ImageStatusName, Job, JobId, JobStatus, JobStatusName,
    JobTimestamps, NetworkPolicy, Os, OsKind, Task,
};
use talus_storage::{EventBus, MaterializedState, Wal};

pub struct Fixture {
    pub os: Os,
    pub image: Image,
    pub code: Code,
    pub task: Task,
}

pub fn seed_catalog(state: &Mutex<MaterializedState>) -> Fixture {
    seed_catalog_with_image_status(state, ImageStatusName::Ready)
}

pub fn seed_catalog_with_image_status(state: &Mutex<MaterializedState>, image_status: ImageStatusName) -> Fixture {
    let os = Os::new("ubuntu", "22.04", OsKind::Linux, "x86_64");
    let image = Image {
        id: talus_core::ImageId::new(),
        name: "base".into(),
        os: os.id,
        base_image: None,
        username: "root".into(),
        password: "toor".into(),
        tags: Vec::new(),
        status: ImageStatus { name: image_status },
        md5: None,
        created_at: 0,
        updated_at: 0,
    };
    let code = Code {
        id: talus_core::CodeId::new(),
        name: "Echo".into(),
        kind: CodeKind::Tool,
        bases: Vec::new(),
        params: Vec::new(),
        desc: String::new(),
        tags: Vec::new(),
    };
    let task = Task {
        id: talus_core::TaskId::new(),
        name: "echo-task".into(),
        tool: code.id,
        image: Some(image.id),
        params: HashMap::new(),
        limit: -1,
        vm_max_seconds: 3600,
        network: NetworkPolicy::All,
        tags: Vec::new(),
    };

    let mut s = state.lock();
    s.oses.insert(os.id.to_string(), os.clone());
    s.images.insert(image.id.to_string(), image.clone());
    s.codes.insert(code.id.to_string(), code.clone());
    s.tasks.insert(task.id.to_string(), task.clone());
    drop(s);

    Fixture { os, image, code, task }
}

pub fn make_job(task: &Task, image: &Image, priority: u8, limit: i64, queue: &str) -> Job {
    Job {
        id: JobId::new(),
        name: "demo".into(),
        task: task.id,
        image: image.id,
        params: HashMap::new(),
        status: JobStatus::new(JobStatusName::Run),
        priority,
        queue: queue.to_string(),
        limit,
        progress: 0,
        vm_max: 3600,
        network: NetworkPolicy::All,
        debug: false,
        errors: Vec::new(),
        logs: Vec::new(),
        timestamps: JobTimestamps::default(),
        tags: Vec::new(),
    }
}

pub fn fresh_engine_parts(dir: &tempfile::TempDir) -> (EventBus, Arc<Mutex<MaterializedState>>) {
    let wal = Wal::open(&dir.path().join("wal.jsonl"), 0).unwrap();
    let (event_bus, _reader) = EventBus::new(wal);
    (event_bus, Arc::new(Mutex::new(MaterializedState::default())))
}
