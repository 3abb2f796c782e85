// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! VM network policy: unrestricted or a host whitelist filter.

use serde::{Deserialize, Serialize};

/// Network policy attached to a Task or Job, parsed from the wire form
/// `"all"` or `"whitelist"` / `"whitelist:host1,host2"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum NetworkPolicy {
    All,
    Whitelist(Vec<String>),
}

impl NetworkPolicy {
    pub fn whitelisted_hosts(&self) -> &[String] {
        match self {
            NetworkPolicy::All => &[],
            NetworkPolicy::Whitelist(hosts) => hosts,
        }
    }
}

impl Default for NetworkPolicy {
    fn default() -> Self {
        NetworkPolicy::Whitelist(Vec::new())
    }
}

impl std::fmt::Display for NetworkPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NetworkPolicy::All => write!(f, "all"),
            NetworkPolicy::Whitelist(hosts) if hosts.is_empty() => write!(f, "whitelist"),
            NetworkPolicy::Whitelist(hosts) => write!(f, "whitelist:{}", hosts.join(",")),
        }
    }
}

impl From<NetworkPolicy> for String {
    fn from(policy: NetworkPolicy) -> Self {
        policy.to_string()
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid network policy: {0:?}")]
pub struct InvalidNetworkPolicy(String);

impl TryFrom<String> for NetworkPolicy {
    type Error = InvalidNetworkPolicy;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        if s == "all" {
            return Ok(NetworkPolicy::All);
        }
        if let Some(rest) = s.strip_prefix("whitelist") {
            let hosts = match rest.strip_prefix(':') {
                Some(list) if !list.is_empty() => {
                    list.split(',').map(|h| h.trim().to_string()).collect()
                }
                _ => Vec::new(),
            };
            return Ok(NetworkPolicy::Whitelist(hosts));
        }
        Err(InvalidNetworkPolicy(s))
    }
}
