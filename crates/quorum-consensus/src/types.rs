// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (c) 2025 The Quorum Authors

//! Consensus-facing types and the collaborator trait for the Raft module.

use std::fmt;
use std::net::SocketAddr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported by the consensus module.
#[derive(Debug, Error)]
pub enum ConsensusError {
    /// The local Raft log could not be read.
    #[error("failed to read raft log: {0}")]
    LogRead(String),

    /// The one-shot bootstrap call was rejected or failed.
    #[error("bootstrap failed: {0}")]
    Bootstrap(String),
}

/// Whether a server's vote counts towards quorum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Suffrage {
    /// Votes in elections and counts towards commitment.
    Voter,
    /// Receives log entries but does not vote.
    Nonvoter,
}

/// One server in a Raft configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationServer {
    /// Server ID.
    pub id: String,
    /// Server RPC address.
    pub address: SocketAddr,
    /// Voting rights.
    pub suffrage: Suffrage,
}

/// A Raft cluster configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    /// Servers in the configuration, in candidate order.
    pub servers: Vec<ConfigurationServer>,
}

impl Configuration {
    /// Returns the number of voting servers.
    #[must_use]
    pub fn voters(&self) -> usize {
        self.servers.iter().filter(|s| s.suffrage == Suffrage::Voter).count()
    }

    /// Returns a comma-separated list of server addresses.
    #[must_use]
    pub fn addresses(&self) -> String {
        self.servers.iter().map(|s| s.address.to_string()).collect::<Vec<_>>().join(",")
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.addresses())
    }
}

/// The local Raft module, as seen by bootstrap coordination.
#[async_trait]
pub trait Consensus: Send + Sync {
    /// Returns the index of the last entry in the local Raft log (0 if empty).
    async fn last_index(&self) -> Result<u64, ConsensusError>;

    /// Initializes the Raft group with the given configuration.
    ///
    /// One-shot: fails if the log already holds state.
    async fn bootstrap_cluster(&self, configuration: Configuration)
        -> Result<(), ConsensusError>;
}
