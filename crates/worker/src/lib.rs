// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker-side runtime: the Slave process and its VMHandler pool (§4.4).
//!
//! [`Slave`] owns the controller handshake, the shared `jobs` queue
//! consumer, and the `max_vms` concurrency semaphore; [`vm_handler::run`] is
//! the per-unit lifecycle it spawns one task per drop to run.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod error;
pub mod guest_comms;
pub mod slave;
pub mod vm_handler;

pub use config::{RuntimeConfig, WorkerConfig};
pub use error::{VmError, WorkerError};
pub use guest_comms::GuestCommsServer;
pub use slave::Slave;
pub use vm_handler::VmContext;
