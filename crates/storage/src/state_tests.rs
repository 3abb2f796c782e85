// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::event::DomainEvent;
use talus_core::{
    FakeClock, Image, ImageId, ImageStatus, ImageStatusName, Job, JobConfig, JobId, JobResult,
    JobStatus, JobStatusName, Os, OsKind, Slave, TaskId,
};

fn sample_job() -> Job {
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_000);
    let config = JobConfig::builder(TaskId::new(), ImageId::new())
        .name("demo")
        .build();
    Job::new(config, &clock)
}

#[test]
fn job_created_inserts_once_and_is_idempotent() {
    let mut state = MaterializedState::default();
    let job = sample_job();
    let event = DomainEvent::JobCreated { job: job.clone() };

    state.apply_event(&event);
    state.apply_event(&event);

    assert_eq!(state.jobs.len(), 1);
    assert_eq!(state.get_job(job.id.as_str()).unwrap().id, job.id);
}

#[test]
fn job_status_changed_stamps_timestamp_once() {
    let mut state = MaterializedState::default();
    let job = sample_job();
    let id = job.id;
    state.apply_event(&DomainEvent::JobCreated { job });

    let event = DomainEvent::JobStatusChanged {
        id,
        status: JobStatus::new(JobStatusName::Running),
        now: 5_000,
    };
    state.apply_event(&event);
    state.apply_event(&event);

    let job = state.jobs.get(id.as_str()).unwrap();
    assert_eq!(job.status.name, JobStatusName::Running);
    assert_eq!(job.timestamps.running, Some(5_000));
}

#[test]
fn job_progress_accumulates_until_terminal() {
    let mut state = MaterializedState::default();
    let job = sample_job();
    let id = job.id;
    state.apply_event(&DomainEvent::JobCreated { job });

    state.apply_event(&DomainEvent::JobProgress { id, amount: 3 });
    state.apply_event(&DomainEvent::JobProgress { id, amount: 4 });
    assert_eq!(state.jobs.get(id.as_str()).unwrap().progress, 7);

    state.apply_event(&DomainEvent::JobStatusChanged {
        id,
        status: JobStatus::new(JobStatusName::Finished),
        now: 9_000,
    });
    state.apply_event(&DomainEvent::JobProgress { id, amount: 100 });
    assert_eq!(state.jobs.get(id.as_str()).unwrap().progress, 7);
}

#[test]
fn job_deleted_removes_from_state() {
    let mut state = MaterializedState::default();
    let job = sample_job();
    let id = job.id;
    state.apply_event(&DomainEvent::JobCreated { job });
    state.apply_event(&DomainEvent::JobDeleted { id });
    assert!(state.jobs.is_empty());
}

#[test]
fn get_job_resolves_unique_prefix() {
    let mut state = MaterializedState::default();
    let job = sample_job();
    let full = job.id.to_string();
    state.apply_event(&DomainEvent::JobCreated { job });

    let prefix = &full[..full.len() - 4];
    assert!(state.get_job(prefix).is_some());
}

#[test]
fn image_status_changed_updates_existing_image() {
    let mut state = MaterializedState::default();
    let os = Os::new("Ubuntu", "22.04", OsKind::Linux, "x86_64");
    let image = Image {
        id: ImageId::new(),
        name: "base".into(),
        os: os.id,
        base_image: None,
        username: "root".into(),
        password: "toor".into(),
        tags: vec![],
        status: ImageStatus {
            name: ImageStatusName::Import,
        },
        md5: None,
        created_at: 1_000,
        updated_at: 1_000,
    };
    let id = image.id;
    state.apply_event(&DomainEvent::ImageRegistered { image });

    state.apply_event(&DomainEvent::ImageStatusChanged {
        id,
        status: ImageStatus {
            name: ImageStatusName::Ready,
        },
        now: 2_000,
    });

    let image = state.images.get(id.as_str()).unwrap();
    assert!(image.is_ready());
    assert_eq!(image.updated_at, 2_000);
}

#[test]
fn slave_status_reported_updates_running_vms() {
    let mut state = MaterializedState::default();
    let slave = Slave::new("uuid-1", "host-a", "10.0.0.5", 1_000);
    state.apply_event(&DomainEvent::SlaveRegistered { slave });

    state.apply_event(&DomainEvent::SlaveStatusReported {
        uuid: "uuid-1".into(),
        running_vms: 2,
        total_jobs_run: 10,
        vms: vec![],
        now: 3_000,
    });

    let slave = state.slaves.get("uuid-1").unwrap();
    assert_eq!(slave.running_vms, 2);
    assert_eq!(slave.total_jobs_run, 10);
}

#[test]
fn slave_removed_drops_entry() {
    let mut state = MaterializedState::default();
    let slave = Slave::new("uuid-1", "host-a", "10.0.0.5", 1_000);
    state.apply_event(&DomainEvent::SlaveRegistered { slave });
    state.apply_event(&DomainEvent::SlaveRemoved {
        uuid: "uuid-1".into(),
    });
    assert!(state.slaves.is_empty());
}

#[test]
fn result_recorded_inserts_by_id() {
    let mut state = MaterializedState::default();
    let result = JobResult::new(
        JobId::new(),
        "result",
        "echo",
        serde_json::json!({"ok": true}),
        4_000,
    );
    let id = result.id;
    state.apply_event(&DomainEvent::ResultRecorded { result });
    assert!(state.results.contains_key(id.as_str()));
}
