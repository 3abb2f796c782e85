// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helper functions for state event handlers.

use std::collections::HashMap;

/// Get a value by exact ID or unique prefix.
///
/// Matches against both the full key and the suffix after the 4-character
/// type prefix (e.g. "job-"), so a short ID shown without its prefix still
/// resolves to the full entry.
pub(crate) fn find_by_prefix<'a, V>(map: &'a HashMap<String, V>, id: &str) -> Option<&'a V> {
    if let Some(val) = map.get(id) {
        return Some(val);
    }
    let matches: Vec<_> = map
        .iter()
        .filter(|(k, _)| {
            k.starts_with(id) || k.get(4..).is_some_and(|suffix| suffix.starts_with(id))
        })
        .collect();
    if matches.len() == 1 {
        Some(matches[0].1)
    } else {
        None
    }
}
