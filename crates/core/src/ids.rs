// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Newtype identifiers for every domain entity.

crate::define_id! {
    /// Identifies an operating system definition.
    pub struct OsId("os-");
}

crate::define_id! {
    /// Identifies a VM image.
    pub struct ImageId("img-");
}

crate::define_id! {
    /// Identifies a tool/component code record.
    pub struct CodeId("cod-");
}

crate::define_id! {
    /// Identifies a task template.
    pub struct TaskId("tsk-");
}

crate::define_id! {
    /// Identifies a job.
    pub struct JobId("job-");
}

crate::define_id! {
    /// Identifies a slave (worker host).
    pub struct SlaveId("slv-");
}

crate::define_id! {
    /// Identifies a result document.
    pub struct ResultId("res-");
}

crate::define_id! {
    /// Identifies a file set.
    pub struct FileSetId("fls-");
}
