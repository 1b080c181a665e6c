// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (c) 2025 The Quorum Authors

//! The gossip layer's view of a node.
//!
//! A [`Member`] is owned and continuously refreshed by the gossip layer. This
//! crate only reads it; the typed projection used by the rest of the server is
//! [`ServerMetadata`](crate::ServerMetadata).

use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// Liveness status of a gossip member.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    /// Status not yet known.
    #[default]
    None,
    /// The member is alive.
    Alive,
    /// The member announced it is leaving.
    Leaving,
    /// The member left gracefully.
    Left,
    /// The member was detected as failed.
    Failed,
    /// The member was reaped after being absent too long.
    ///
    /// Never reported by the gossip layer itself; set on members queued for
    /// reconciliation from a reap event.
    Reap,
}

impl MemberStatus {
    /// Returns the status name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Alive => "alive",
            Self::Leaving => "leaving",
            Self::Left => "left",
            Self::Failed => "failed",
            Self::Reap => "reap",
        }
    }
}

impl fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node as seen by the gossip layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Gossip node name.
    pub name: String,
    /// Advertised IP address.
    pub addr: IpAddr,
    /// Gossip port.
    pub port: u16,
    /// Open tag mapping advertised by the node.
    pub tags: BTreeMap<String, String>,
    /// Liveness status.
    pub status: MemberStatus,
}

impl Member {
    /// Creates an alive member with no tags.
    #[must_use]
    pub fn new(name: impl Into<String>, addr: IpAddr, port: u16) -> Self {
        Self { name: name.into(), addr, port, tags: BTreeMap::new(), status: MemberStatus::Alive }
    }

    /// Adds a tag.
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Replaces all tags.
    #[must_use]
    pub fn with_tags(mut self, tags: BTreeMap<String, String>) -> Self {
        self.tags = tags;
        self
    }

    /// Sets the status.
    #[must_use]
    pub fn with_status(mut self, status: MemberStatus) -> Self {
        self.status = status;
        self
    }

    /// Returns a tag value.
    #[must_use]
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Returns true if the tag is present, whatever its value.
    #[must_use]
    pub fn has_tag(&self, key: &str) -> bool {
        self.tags.contains_key(key)
    }
}

/// Snapshot access to the current gossip membership.
///
/// Implemented by the gossip layer. The snapshot is point-in-time and may
/// lag behind the event stream.
pub trait MemberSource: Send + Sync {
    /// Returns every member currently known to the local gossip pool.
    fn members(&self) -> Vec<Member>;
}

/// A fixed member list, mostly useful in tests and tooling.
impl MemberSource for Vec<Member> {
    fn members(&self) -> Vec<Member> {
        self.clone()
    }
}
