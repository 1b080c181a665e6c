// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (c) 2025 The Quorum Authors

//! Quorum Consensus - automatic formation of the Raft group.
//!
//! This crate decides, without operator action, when a freshly started set of
//! servers agrees closely enough to initialize its first Raft configuration.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              Membership Event Dispatcher (join)              │
//! └──────────────────────────────┬──────────────────────────────┘
//!                                ▼
//!                 ┌─────────────────────────────┐
//!                 │    BootstrapCoordinator     │
//!                 │  last_index == 0 ?          │
//!                 │  voters >= expect ?         │
//!                 │  nobody has peers ?         │
//!                 └──────┬───────────────┬──────┘
//!                        │               │
//!                        ▼               ▼
//!              ┌──────────────┐   ┌──────────────┐
//!              │  PeerProber  │   │  Consensus   │
//!              │ Status.Peers │   │  bootstrap   │
//!              └──────────────┘   └──────────────┘
//! ```
//!
//! The Raft implementation and the RPC transport are external; they are
//! reached through the [`Consensus`] and [`PeerStatusClient`] traits.
//!
//! # Usage
//!
//! ```ignore
//! use quorum_consensus::BootstrapCoordinator;
//!
//! let coordinator = BootstrapCoordinator::from_config(&config.server, raft, gossip, rpc);
//! let outcome = coordinator.maybe_bootstrap().await;
//! ```

#![warn(missing_docs)]

pub mod bootstrap;
pub mod prober;
pub mod types;

pub use bootstrap::{BootstrapCoordinator, BootstrapOutcome, BootstrapState, BootstrapStateReader};
pub use prober::{
    retry_backoff, DatacenterRequest, PeerProber, PeerStatusClient, RpcError, RpcTarget,
    MAX_PEER_RETRIES, STATUS_PEERS_METHOD,
};
pub use types::{Configuration, ConfigurationServer, Consensus, ConsensusError, Suffrage};
