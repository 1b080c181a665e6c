// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (c) 2025 The Quorum Authors

//! Events delivered by the gossip layer.

use quorum_core::Member;

/// A membership change kind, for events that carry members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberEventKind {
    /// Members joined the pool.
    Join,
    /// Members left gracefully.
    Leave,
    /// Members were detected as failed.
    Failed,
    /// Members were reaped after a long absence.
    Reap,
    /// Members changed their tags.
    Update,
}

impl MemberEventKind {
    /// Returns the event name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Join => "member-join",
            Self::Leave => "member-leave",
            Self::Failed => "member-failed",
            Self::Reap => "member-reap",
            Self::Update => "member-update",
        }
    }
}

/// A user event broadcast through the gossip layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserEvent {
    /// Lamport time of the event.
    pub ltime: u64,
    /// Event name.
    pub name: String,
    /// Opaque payload.
    pub payload: Vec<u8>,
    /// Whether the gossip layer may coalesce events of this name.
    pub coalesce: bool,
}

impl UserEvent {
    /// Creates a non-coalescing event at Lamport time 0.
    #[must_use]
    pub fn new(name: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self { ltime: 0, name: name.into(), payload: payload.into(), coalesce: false }
    }
}

/// A query broadcast through the gossip layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryEvent {
    /// Query name.
    pub name: String,
    /// Opaque payload.
    pub payload: Vec<u8>,
}

/// An event delivered by the gossip layer, in delivery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipEvent {
    /// Members joined.
    Join(Vec<Member>),
    /// Members left gracefully.
    Leave(Vec<Member>),
    /// Members failed.
    Failed(Vec<Member>),
    /// Members were reaped.
    Reap(Vec<Member>),
    /// Members updated their tags.
    Update(Vec<Member>),
    /// A user event.
    User(UserEvent),
    /// A query. Not answered by this node.
    Query(QueryEvent),
    /// An event type this node does not interpret.
    Other(String),
}

impl MembershipEvent {
    /// Returns the event name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Join(_) => MemberEventKind::Join.as_str(),
            Self::Leave(_) => MemberEventKind::Leave.as_str(),
            Self::Failed(_) => MemberEventKind::Failed.as_str(),
            Self::Reap(_) => MemberEventKind::Reap.as_str(),
            Self::Update(_) => MemberEventKind::Update.as_str(),
            Self::User(_) => "user",
            Self::Query(_) => "query",
            Self::Other(kind) => kind,
        }
    }

    /// Returns the membership change kind and members, for member events.
    #[must_use]
    pub fn members(&self) -> Option<(MemberEventKind, &[Member])> {
        match self {
            Self::Join(m) => Some((MemberEventKind::Join, m)),
            Self::Leave(m) => Some((MemberEventKind::Leave, m)),
            Self::Failed(m) => Some((MemberEventKind::Failed, m)),
            Self::Reap(m) => Some((MemberEventKind::Reap, m)),
            Self::Update(m) => Some((MemberEventKind::Update, m)),
            Self::User(_) | Self::Query(_) | Self::Other(_) => None,
        }
    }
}
