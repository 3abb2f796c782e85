// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test-only [`HypervisorAdapter`] double: no real libvirt connection, just
//! an in-memory set of "running" domains so `talus-worker` tests can drive
//! the full VMHandler lifecycle deterministically.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;

use crate::hypervisor::{AdapterError, DomainHandle, DomainSpec, HypervisorAdapter};

#[derive(Default)]
pub struct FakeHypervisorAdapter {
    running: Mutex<HashSet<String>>,
    fail_create: Mutex<HashSet<String>>,
    filters: Mutex<HashSet<String>>,
}

impl FakeHypervisorAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a domain name as one whose `create_domain` call should fail,
    /// simulating scenario F (corrupt overlay, guest never boots).
    pub fn fail_to_start(&self, name: impl Into<String>) {
        self.fail_create.lock().insert(name.into());
    }

    pub fn is_tracked(&self, name: &str) -> bool {
        self.running.lock().contains(name)
    }

    pub fn has_filter(&self, name: &str) -> bool {
        self.filters.lock().contains(name)
    }
}

#[async_trait]
impl HypervisorAdapter for FakeHypervisorAdapter {
    async fn create_domain(&self, spec: &DomainSpec) -> Result<DomainHandle, AdapterError> {
        if self.fail_create.lock().contains(&spec.name) {
            return Err(AdapterError::DomainStartFailed(format!("fake failure for {}", spec.name)));
        }
        self.running.lock().insert(spec.name.clone());
        Ok(DomainHandle::new(spec.name.clone()))
    }

    async fn destroy(&self, handle: &DomainHandle) -> Result<(), AdapterError> {
        self.running.lock().remove(&handle.name);
        Ok(())
    }

    async fn is_running(&self, handle: &DomainHandle) -> Result<bool, AdapterError> {
        Ok(self.running.lock().contains(&handle.name))
    }

    async fn find_pid(&self, _handle: &DomainHandle) -> Result<Option<u32>, AdapterError> {
        Ok(None)
    }

    async fn define_filter(&self, name: &str, _xml: &str) -> Result<(), AdapterError> {
        self.filters.lock().insert(name.to_string());
        Ok(())
    }

    async fn undefine_filter(&self, name: &str) -> Result<(), AdapterError> {
        self.filters.lock().remove(name);
        Ok(())
    }
}
