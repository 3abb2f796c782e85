// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hypervisor and image-store adapters for the worker side of Talus.
//!
//! [`HypervisorAdapter`] abstracts domain lifecycle so `talus-worker` never
//! talks to libvirt directly; [`LibvirtAdapter`] is the sole production
//! implementation. [`ImageManager`] tracks locally cached base/overlay images
//! and coalesces concurrent downloads of the same image id.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod domain_xml;
mod filter_xml;
mod hypervisor;
mod image;
mod libvirt;

#[cfg(any(test, feature = "test-support"))]
mod fake;

pub use domain_xml::{build_domain_xml, DomainXmlSpec};
pub use filter_xml::build_filter_xml;
pub use hypervisor::{AdapterError, DomainHandle, DomainSpec, HypervisorAdapter};
pub use image::{ImageManager, ImageManagerError};
pub use libvirt::LibvirtAdapter;

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeHypervisorAdapter;
