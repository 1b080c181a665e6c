// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (c) 2025 The Quorum Authors

//! Quorum Core - shared types for the server membership layer.
//!
//! This crate holds everything the gossip-facing and consensus-facing crates
//! agree on:
//! - The gossip layer's view of a node ([`Member`], [`MemberStatus`])
//! - The tag contract servers advertise over gossip ([`tags`])
//! - Validation of a member into typed [`ServerMetadata`]
//! - Configuration, error types and logging setup
//!
//! # Key Principle
//!
//! **Gossip for discovery, Raft for authority:**
//! - Gossip answers "who exists?" (fast, distributed, eventually consistent)
//! - Raft answers "who is IN the cluster?" (slow, strongly consistent)
//!
//! Nothing in this crate talks to the network. The gossip protocol and the
//! consensus module are external collaborators reached through traits.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod logging;
pub mod member;
pub mod metadata;
pub mod tags;

pub use config::{Config, LogFormat, LoggingConfig, ReconcileConfig, ServerConfig, TlsConfig};
pub use error::{Error, Result};
pub use member::{Member, MemberSource, MemberStatus};
pub use metadata::{AclMode, BuildVersion, ServerMetadata};
pub use tags::{GossipPool, ServerTags};

/// Lowest wire protocol version this build can speak.
pub const PROTOCOL_VERSION_MIN: u8 = 2;

/// Highest wire protocol version this build can speak.
pub const PROTOCOL_VERSION_MAX: u8 = 3;
