// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job result and fileset event handlers.

use super::MaterializedState;
use crate::event::DomainEvent;

pub(crate) fn apply(state: &mut MaterializedState, event: &DomainEvent) {
    match event {
        DomainEvent::ResultRecorded { result } => {
            state.results.insert(result.id.to_string(), result.clone());
        }

        DomainEvent::FileSetUpdated { fileset } => {
            state.filesets.insert(fileset.id.to_string(), fileset.clone());
        }

        _ => {}
    }
}
