// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire protocol for every external interface Talus exposes.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod drop;
mod framing;
mod guest;
mod job_status;
mod slave_status;

pub use drop::{fileset_name, JobDrop};
pub use framing::{decode, encode, read_message, write_message, WireError, MAX_FRAME_LEN};
pub use guest::{GuestMessage, GuestMessageType};
pub use job_status::{ErrorPayload, JobStatusMessage, ResultPayload};
pub use slave_status::{BroadcastMessage, CodeCredentials, SlaveCommand, SlaveStatusMessage};
