// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (c) 2025 The Quorum Authors

//! Remote Raft peer status queries with bounded retry.
//!
//! Before bootstrapping, every candidate server is asked for its current Raft
//! peer set. A server that cannot be reached after all attempts is reported as
//! having no peers, the same as a fresh server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use quorum_core::ServerMetadata;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, warn};

/// RPC method queried for a server's Raft peers.
pub const STATUS_PEERS_METHOD: &str = "Status.Peers";

/// Attempts made against one server before giving up.
pub const MAX_PEER_RETRIES: u32 = 6;

/// Errors from a remote peer status query.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The server could not be reached.
    #[error("server unreachable: {0}")]
    Unreachable(String),

    /// The server answered with an error.
    #[error("remote error: {0}")]
    Remote(String),

    /// The query timed out.
    #[error("rpc timed out")]
    Timeout,
}

/// A request scoped to one datacenter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatacenterRequest {
    /// Datacenter the request is addressed to.
    pub datacenter: String,
}

/// The server an RPC is routed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcTarget {
    /// Datacenter of the target.
    pub datacenter: String,
    /// Short node name of the target.
    pub short_name: String,
    /// RPC address of the target.
    pub addr: SocketAddr,
    /// RPC method to invoke.
    pub method: &'static str,
}

/// Client for the `Status.Peers` RPC.
#[async_trait]
pub trait PeerStatusClient: Send + Sync {
    /// Asks `target` for the addresses of its current Raft peers.
    async fn status_peers(
        &self,
        target: &RpcTarget,
        request: &DatacenterRequest,
    ) -> Result<Vec<String>, RpcError>;
}

/// Delay before retrying after failed attempt `attempt` (zero-based): 2^attempt seconds.
#[must_use]
pub fn retry_backoff(attempt: u32) -> Duration {
    Duration::from_secs(1u64 << attempt.min(63))
}

/// Queries servers for their Raft peers, retrying with exponential backoff.
#[derive(Clone)]
pub struct PeerProber {
    client: Arc<dyn PeerStatusClient>,
    datacenter: String,
    max_attempts: u32,
}

impl PeerProber {
    /// Creates a prober issuing requests on behalf of `datacenter`.
    pub fn new(client: Arc<dyn PeerStatusClient>, datacenter: impl Into<String>) -> Self {
        Self { client, datacenter: datacenter.into(), max_attempts: MAX_PEER_RETRIES }
    }

    /// Returns the number of attempts made per server.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the Raft peers reported by `server`.
    ///
    /// Sleeps between failed attempts on the calling task. If every attempt
    /// fails the server is treated as reporting no peers.
    pub async fn peers(&self, server: &ServerMetadata) -> Vec<String> {
        let target = RpcTarget {
            datacenter: self.datacenter.clone(),
            short_name: server.short_name.clone(),
            addr: server.addr,
            method: STATUS_PEERS_METHOD,
        };
        let request = DatacenterRequest { datacenter: self.datacenter.clone() };

        for attempt in 0..self.max_attempts {
            match self.client.status_peers(&target, &request).await {
                Ok(peers) => {
                    debug!(
                        server = %server.name,
                        peers = peers.len(),
                        attempt = attempt,
                        "Received peer status"
                    );
                    return peers;
                }
                Err(e) => {
                    let next_retry = retry_backoff(attempt);
                    counter!("quorum_peer_probe_failures_total").increment(1);
                    error!(
                        server = %server.name,
                        retry_interval = ?next_retry,
                        error = %e,
                        "Failed to confirm peer status for server (will retry)"
                    );
                    tokio::time::sleep(next_retry).await;
                }
            }
        }

        warn!(
            server = %server.name,
            attempts = self.max_attempts,
            "Peer status unavailable, treating server as having no peers"
        );
        Vec::new()
    }
}

impl std::fmt::Debug for PeerProber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerProber")
            .field("datacenter", &self.datacenter)
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}
