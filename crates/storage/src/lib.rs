// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WAL-backed materialized state: the durable heart of the controller.
//!
//! Every mutation is first a [`DomainEvent`] appended to the [`Wal`]; the
//! engine folds events into a [`MaterializedState`] as it consumes them
//! through an [`EventReader`]. Periodic [`Checkpointer`] snapshots bound
//! how much of the WAL a restart has to replay.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod checkpoint;
mod event;
mod event_bus;
mod migration;
mod snapshot;
mod state;
mod wal;

pub use checkpoint::{load_snapshot, Checkpointer};
pub use event::DomainEvent;
pub use event_bus::{EventBus, EventReader};
pub use migration::{Migration, MigrationError, MigrationRegistry};
pub use snapshot::{Snapshot, SnapshotError, CURRENT_SNAPSHOT_VERSION};
pub use state::MaterializedState;
pub use wal::{Wal, WalEntry, WalError};
