// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (c) 2025 The Quorum Authors

//! Automatic bootstrap of the Raft group from gossip membership.
//!
//! A server started with `bootstrap_expect = N` waits until it sees `N` voting
//! servers of its own datacenter in the gossip pool, confirms none of them
//! already belongs to a Raft cluster, then initializes the group with all of
//! them in one shot.
//!
//! # State
//!
//! ```text
//!            existing log / peers found / bootstrap attempted
//! Armed(N) ─────────────────────────────────────────────────► Disarmed
//!    ▲  │
//!    └──┘ conflicting expect, self-bootstrapped member, quorum not met
//! ```
//!
//! Disarming is one-way for the lifetime of a [`BootstrapState`]. Aborts that
//! leave the state armed are re-evaluated from scratch on the next join.

use std::sync::Arc;

use metrics::counter;
use quorum_core::{MemberSource, ServerConfig, ServerMetadata};
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::prober::{PeerProber, PeerStatusClient};
use crate::types::{Configuration, ConfigurationServer, Consensus, Suffrage};

/// Expected voter count for automatic bootstrap, owned by the coordinator.
///
/// Readers obtained through [`subscribe`](Self::subscribe) observe changes
/// eventually; only the coordinator can disarm.
#[derive(Debug)]
pub struct BootstrapState {
    tx: watch::Sender<u32>,
}

impl BootstrapState {
    /// Creates a state armed with `expect` voters (0 means disarmed).
    #[must_use]
    pub fn new(expect: u32) -> Self {
        let (tx, _) = watch::channel(expect);
        Self { tx }
    }

    /// Returns the expected voter count, 0 once disarmed.
    #[must_use]
    pub fn expect(&self) -> u32 {
        *self.tx.borrow()
    }

    /// Returns true while automatic bootstrap may still happen.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.expect() != 0
    }

    /// Returns a read-only handle for status reporting.
    #[must_use]
    pub fn subscribe(&self) -> BootstrapStateReader {
        BootstrapStateReader { rx: self.tx.subscribe() }
    }

    fn disarm(&self) {
        self.tx.send_if_modified(|expect| {
            let changed = *expect != 0;
            *expect = 0;
            changed
        });
    }
}

/// Read-only view of a [`BootstrapState`].
#[derive(Debug, Clone)]
pub struct BootstrapStateReader {
    rx: watch::Receiver<u32>,
}

impl BootstrapStateReader {
    /// Returns the last observed expected voter count.
    #[must_use]
    pub fn expect(&self) -> u32 {
        *self.rx.borrow()
    }

    /// Returns true if the last observed state is armed.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.expect() != 0
    }

    /// Waits until the state is disarmed.
    ///
    /// Returns false if the owning state was dropped while still armed.
    pub async fn disarmed(&mut self) -> bool {
        self.rx.wait_for(|expect| *expect == 0).await.is_ok()
    }
}

/// Result of one bootstrap evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// Automatic bootstrap is not (or no longer) expected.
    NotArmed,
    /// The local Raft log could not be read; retried on the next join.
    LogReadFailed,
    /// The local Raft log holds entries; disarmed.
    ExistingLog {
        /// Last log index found.
        last_index: u64,
    },
    /// A member expects a different voter count; retried on the next join.
    ConflictingExpect {
        /// The conflicting member.
        member: String,
        /// The count it advertised.
        expect: u32,
    },
    /// A member runs in manual bootstrap mode; retried on the next join.
    SelfBootstrapDetected {
        /// The bootstrapping member.
        member: String,
    },
    /// Not enough voters yet; retried on the next join.
    QuorumNotMet {
        /// Voters seen.
        voters: usize,
        /// Voters required.
        expect: u32,
    },
    /// A candidate already has Raft peers; disarmed.
    ExistingPeers {
        /// The server reporting peers.
        server: String,
    },
    /// The Raft group was initialized; disarmed.
    Bootstrapped {
        /// The configuration submitted.
        configuration: Configuration,
    },
    /// The bootstrap call failed; disarmed regardless.
    BootstrapFailed {
        /// The configuration submitted.
        configuration: Configuration,
        /// The error reported by the consensus module.
        error: String,
    },
}

impl BootstrapOutcome {
    /// Returns a short label for logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotArmed => "not_armed",
            Self::LogReadFailed => "log_read_failed",
            Self::ExistingLog { .. } => "existing_log",
            Self::ConflictingExpect { .. } => "conflicting_expect",
            Self::SelfBootstrapDetected { .. } => "self_bootstrap_detected",
            Self::QuorumNotMet { .. } => "quorum_not_met",
            Self::ExistingPeers { .. } => "existing_peers",
            Self::Bootstrapped { .. } => "bootstrapped",
            Self::BootstrapFailed { .. } => "bootstrap_failed",
        }
    }

    /// Returns true if this outcome disarms automatic bootstrap.
    #[must_use]
    pub const fn disarms(&self) -> bool {
        matches!(
            self,
            Self::ExistingLog { .. }
                | Self::ExistingPeers { .. }
                | Self::Bootstrapped { .. }
                | Self::BootstrapFailed { .. }
        )
    }
}

/// Decides whether and how this server initializes the Raft group.
pub struct BootstrapCoordinator {
    datacenter: String,
    consensus: Arc<dyn Consensus>,
    members: Arc<dyn MemberSource>,
    prober: PeerProber,
    state: BootstrapState,
}

impl BootstrapCoordinator {
    /// Creates a coordinator armed with `expect` voters.
    pub fn new(
        datacenter: impl Into<String>,
        expect: u32,
        consensus: Arc<dyn Consensus>,
        members: Arc<dyn MemberSource>,
        prober: PeerProber,
    ) -> Self {
        Self {
            datacenter: datacenter.into(),
            consensus,
            members,
            prober,
            state: BootstrapState::new(expect),
        }
    }

    /// Creates a coordinator from server configuration.
    pub fn from_config(
        config: &ServerConfig,
        consensus: Arc<dyn Consensus>,
        members: Arc<dyn MemberSource>,
        client: Arc<dyn PeerStatusClient>,
    ) -> Self {
        let prober = PeerProber::new(client, config.datacenter.clone());
        Self::new(config.datacenter.clone(), config.bootstrap_expect, consensus, members, prober)
    }

    /// Returns the bootstrap state.
    #[must_use]
    pub fn state(&self) -> &BootstrapState {
        &self.state
    }

    /// Evaluates the gossip pool and bootstraps the Raft group if every
    /// condition holds.
    ///
    /// Runs to completion on the calling task, including peer probe backoff.
    pub async fn maybe_bootstrap(&self) -> BootstrapOutcome {
        let outcome = self.evaluate().await;
        counter!("quorum_bootstrap_evaluations_total", "outcome" => outcome.as_str())
            .increment(1);
        outcome
    }

    async fn evaluate(&self) -> BootstrapOutcome {
        let expect = self.state.expect();
        if expect == 0 {
            return BootstrapOutcome::NotArmed;
        }

        // Bootstrap is only possible with an empty log. Cheaper than letting
        // the bootstrap call reject it.
        match self.consensus.last_index().await {
            Err(e) => {
                error!(error = %e, "Failed to read last raft index");
                return BootstrapOutcome::LogReadFailed;
            }
            Ok(last_index) if last_index != 0 => {
                info!(last_index = last_index, "Raft data found, disabling bootstrap mode");
                self.state.disarm();
                return BootstrapOutcome::ExistingLog { last_index };
            }
            Ok(_) => {}
        }

        let mut servers: Vec<ServerMetadata> = Vec::new();
        let mut voters = 0usize;
        for member in self.members.members() {
            let Some(server) = ServerMetadata::from_member(&member) else {
                continue;
            };
            if server.datacenter != self.datacenter {
                warn!(
                    member = %member.name,
                    datacenter = %server.datacenter,
                    "Member has a conflicting datacenter, ignoring"
                );
                continue;
            }
            if server.expect != 0 && server.expect != expect {
                error!(
                    member = %member.name,
                    member_expect = server.expect,
                    expect = expect,
                    "Member has a conflicting expect value. All nodes should expect the same number."
                );
                return BootstrapOutcome::ConflictingExpect {
                    member: member.name,
                    expect: server.expect,
                };
            }
            if server.bootstrap {
                error!(member = %member.name, "Member has bootstrap mode. Expect disabled.");
                return BootstrapOutcome::SelfBootstrapDetected { member: member.name };
            }
            if !server.read_replica {
                voters += 1;
            }
            servers.push(server);
        }

        if voters < expect as usize {
            return BootstrapOutcome::QuorumNotMet { voters, expect };
        }

        // Sequential on purpose: each probe may sleep through its backoff.
        for server in &servers {
            let peers = self.prober.peers(server).await;
            if !peers.is_empty() {
                // An existing cluster will fold this server in; bootstrapping
                // here would only cause spurious elections.
                info!(
                    server = %server.name,
                    peers = peers.len(),
                    "Existing Raft peers reported by server, disabling bootstrap mode"
                );
                self.state.disarm();
                return BootstrapOutcome::ExistingPeers { server: server.name.clone() };
            }
        }

        let configuration = Configuration {
            servers: servers
                .iter()
                .map(|server| ConfigurationServer {
                    id: server.id.clone(),
                    address: server.addr,
                    suffrage: if server.read_replica { Suffrage::Nonvoter } else { Suffrage::Voter },
                })
                .collect(),
        };

        info!(
            peers = %configuration.addresses(),
            "Found expected number of peers, attempting bootstrap"
        );

        let outcome = match self.consensus.bootstrap_cluster(configuration.clone()).await {
            Ok(()) => {
                info!(servers = configuration.servers.len(), "Bootstrapped raft cluster");
                BootstrapOutcome::Bootstrapped { configuration }
            }
            Err(e) => {
                error!(error = %e, "Failed to bootstrap cluster");
                BootstrapOutcome::BootstrapFailed { configuration, error: e.to_string() }
            }
        };

        // Succeeded or failed, never attempted again.
        self.state.disarm();
        outcome
    }
}

impl std::fmt::Debug for BootstrapCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapCoordinator")
            .field("datacenter", &self.datacenter)
            .field("expect", &self.state.expect())
            .field("prober", &self.prober)
            .finish()
    }
}
