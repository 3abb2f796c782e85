// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handlers for the reference-data collections: operating systems, images,
//! tool/component code, and tasks.

use super::MaterializedState;
use crate::event::DomainEvent;

pub(crate) fn apply(state: &mut MaterializedState, event: &DomainEvent) {
    match event {
        DomainEvent::OsRegistered { os } => {
            state.oses.insert(os.id.to_string(), os.clone());
        }

        DomainEvent::ImageRegistered { image } => {
            state.images.insert(image.id.to_string(), image.clone());
        }

        DomainEvent::ImageStatusChanged { id, status, now } => {
            if let Some(image) = state.images.get_mut(id.as_str()) {
                image.status = status.clone();
                image.updated_at = *now;
            }
        }

        DomainEvent::CodeRegistered { code } => {
            state.codes.insert(code.id.to_string(), code.clone());
        }

        DomainEvent::TaskRegistered { task } => {
            state.tasks.insert(task.id.to_string(), task.clone());
        }

        _ => {}
    }
}
