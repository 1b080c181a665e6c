// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (c) 2025 The Quorum Authors

//! Integration tests for automatic Raft bootstrap.
//!
//! These tests verify:
//! - Existing Raft state disarms bootstrap without any RPCs
//! - Misconfigured pools abort while staying armed
//! - Peer evidence of an existing cluster disarms bootstrap
//! - The submitted configuration mirrors the accepted candidates

use std::collections::{HashMap, HashSet};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use quorum_consensus::{
    BootstrapCoordinator, BootstrapOutcome, Configuration, Consensus, ConsensusError,
    DatacenterRequest, PeerProber, PeerStatusClient, RpcError, RpcTarget, Suffrage,
    STATUS_PEERS_METHOD,
};
use quorum_core::{Member, MemberSource};

/// Raft stand-in recording bootstrap calls.
#[derive(Default)]
struct MockConsensus {
    last_index: u64,
    fail_last_index: bool,
    fail_bootstrap: bool,
    bootstraps: Mutex<Vec<Configuration>>,
}

#[async_trait]
impl Consensus for MockConsensus {
    async fn last_index(&self) -> Result<u64, ConsensusError> {
        if self.fail_last_index {
            return Err(ConsensusError::LogRead("io error".to_string()));
        }
        Ok(self.last_index)
    }

    async fn bootstrap_cluster(&self, configuration: Configuration) -> Result<(), ConsensusError> {
        self.bootstraps.lock().push(configuration);
        if self.fail_bootstrap {
            return Err(ConsensusError::Bootstrap("already bootstrapped".to_string()));
        }
        Ok(())
    }
}

/// Peer status client answering per target address.
#[derive(Default)]
struct MockPeerClient {
    peers: HashMap<SocketAddr, Vec<String>>,
    unreachable: HashSet<SocketAddr>,
    calls: Mutex<Vec<SocketAddr>>,
}

impl MockPeerClient {
    fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl PeerStatusClient for MockPeerClient {
    async fn status_peers(
        &self,
        target: &RpcTarget,
        request: &DatacenterRequest,
    ) -> Result<Vec<String>, RpcError> {
        assert_eq!(request.datacenter, "dc1");
        assert_eq!(target.method, STATUS_PEERS_METHOD);
        self.calls.lock().push(target.addr);
        if self.unreachable.contains(&target.addr) {
            return Err(RpcError::Unreachable(target.addr.to_string()));
        }
        Ok(self.peers.get(&target.addr).cloned().unwrap_or_default())
    }
}

fn ip(last: u8) -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
}

fn rpc_addr(last: u8) -> SocketAddr {
    SocketAddr::new(ip(last), 8300)
}

/// Creates a valid server member of dc1 expecting `expect` voters.
fn server(last: u8, expect: u32) -> Member {
    let member = Member::new(format!("server-{last}"), ip(last), 8301)
        .with_tag("role", "consul")
        .with_tag("dc", "dc1")
        .with_tag("segment", "")
        .with_tag("id", format!("id-{last}"))
        .with_tag("port", "8300")
        .with_tag("build", "1.9.0")
        .with_tag("vsn", "2")
        .with_tag("raft_vsn", "3");
    if expect == 0 {
        member
    } else {
        member.with_tag("expect", expect.to_string())
    }
}

fn coordinator(
    expect: u32,
    consensus: Arc<MockConsensus>,
    members: Vec<Member>,
    client: Arc<MockPeerClient>,
) -> BootstrapCoordinator {
    let prober = PeerProber::new(client, "dc1");
    BootstrapCoordinator::new("dc1", expect, consensus, Arc::new(members), prober)
}

#[tokio::test]
async fn test_three_fresh_servers_bootstrap() {
    let consensus = Arc::new(MockConsensus::default());
    let client = Arc::new(MockPeerClient::default());
    let members = vec![server(1, 3), server(2, 3), server(3, 3)];
    let coordinator = coordinator(3, consensus.clone(), members, client.clone());

    let outcome = coordinator.maybe_bootstrap().await;

    assert!(matches!(outcome, BootstrapOutcome::Bootstrapped { .. }));
    assert!(!coordinator.state().is_armed());
    assert_eq!(client.call_count(), 3);

    let bootstraps = consensus.bootstraps.lock();
    assert_eq!(bootstraps.len(), 1);
    let configuration = &bootstraps[0];
    assert_eq!(configuration.servers.len(), 3);
    assert!(configuration.servers.iter().all(|s| s.suffrage == Suffrage::Voter));
    let ids: Vec<&str> = configuration.servers.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["id-1", "id-2", "id-3"]);
    assert_eq!(configuration.servers[0].address, rpc_addr(1));
}

#[tokio::test]
async fn test_existing_log_disarms_without_rpcs() {
    let consensus = Arc::new(MockConsensus { last_index: 42, ..Default::default() });
    let client = Arc::new(MockPeerClient::default());
    let members = vec![server(1, 3), server(2, 3), server(3, 3)];
    let coordinator = coordinator(3, consensus.clone(), members, client.clone());

    let outcome = coordinator.maybe_bootstrap().await;

    assert_eq!(outcome, BootstrapOutcome::ExistingLog { last_index: 42 });
    assert!(!coordinator.state().is_armed());
    assert_eq!(client.call_count(), 0);
    assert!(consensus.bootstraps.lock().is_empty());

    // Disarmed for good: later evaluations do nothing.
    assert_eq!(coordinator.maybe_bootstrap().await, BootstrapOutcome::NotArmed);
}

#[tokio::test]
async fn test_log_read_failure_stays_armed() {
    let consensus = Arc::new(MockConsensus { fail_last_index: true, ..Default::default() });
    let client = Arc::new(MockPeerClient::default());
    let members = vec![server(1, 3), server(2, 3), server(3, 3)];
    let coordinator = coordinator(3, consensus.clone(), members, client.clone());

    assert_eq!(coordinator.maybe_bootstrap().await, BootstrapOutcome::LogReadFailed);
    assert_eq!(coordinator.state().expect(), 3);
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn test_quorum_not_met_issues_no_rpcs() {
    let consensus = Arc::new(MockConsensus::default());
    let client = Arc::new(MockPeerClient::default());
    let members = vec![server(1, 3), server(2, 3)];
    let coordinator = coordinator(3, consensus.clone(), members, client.clone());

    let outcome = coordinator.maybe_bootstrap().await;

    assert_eq!(outcome, BootstrapOutcome::QuorumNotMet { voters: 2, expect: 3 });
    assert!(coordinator.state().is_armed());
    assert_eq!(client.call_count(), 0);
    assert!(consensus.bootstraps.lock().is_empty());
}

#[tokio::test]
async fn test_conflicting_expect_stays_armed() {
    let consensus = Arc::new(MockConsensus::default());
    let client = Arc::new(MockPeerClient::default());
    let members = vec![server(1, 3), server(2, 3), server(3, 3), server(4, 5)];
    let coordinator = coordinator(3, consensus.clone(), members, client.clone());

    for _ in 0..2 {
        let outcome = coordinator.maybe_bootstrap().await;
        assert_eq!(
            outcome,
            BootstrapOutcome::ConflictingExpect { member: "server-4".to_string(), expect: 5 }
        );
        assert_eq!(coordinator.state().expect(), 3);
    }

    assert_eq!(client.call_count(), 0);
    assert!(consensus.bootstraps.lock().is_empty());
}

#[tokio::test]
async fn test_member_without_expect_is_accepted() {
    let consensus = Arc::new(MockConsensus::default());
    let client = Arc::new(MockPeerClient::default());
    let members = vec![server(1, 3), server(2, 0), server(3, 3)];
    let coordinator = coordinator(3, consensus.clone(), members, client.clone());

    assert!(matches!(coordinator.maybe_bootstrap().await, BootstrapOutcome::Bootstrapped { .. }));
}

#[tokio::test]
async fn test_self_bootstrapped_member_stays_armed() {
    let consensus = Arc::new(MockConsensus::default());
    let client = Arc::new(MockPeerClient::default());
    let members = vec![server(1, 3), server(2, 0).with_tag("bootstrap", "1"), server(3, 3)];
    let coordinator = coordinator(3, consensus.clone(), members, client.clone());

    let outcome = coordinator.maybe_bootstrap().await;

    assert_eq!(outcome, BootstrapOutcome::SelfBootstrapDetected { member: "server-2".to_string() });
    assert!(coordinator.state().is_armed());
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn test_foreign_datacenter_and_non_servers_skipped() {
    let consensus = Arc::new(MockConsensus::default());
    let client = Arc::new(MockPeerClient::default());
    let members = vec![
        server(1, 3),
        server(2, 3),
        server(9, 5).with_tag("dc", "dc2"),
        Member::new("client-1", ip(20), 8301).with_tag("role", "node"),
        server(3, 3),
    ];
    let coordinator = coordinator(3, consensus.clone(), members, client.clone());

    let outcome = coordinator.maybe_bootstrap().await;

    let BootstrapOutcome::Bootstrapped { configuration } = outcome else {
        panic!("expected bootstrap, got {outcome:?}");
    };
    assert_eq!(configuration.servers.len(), 3);
    assert!(!client.calls.lock().contains(&rpc_addr(9)));
}

#[tokio::test]
async fn test_read_replicas_become_nonvoters() {
    let consensus = Arc::new(MockConsensus::default());
    let client = Arc::new(MockPeerClient::default());
    let members = vec![
        server(1, 3),
        server(2, 3),
        server(3, 3),
        server(4, 3).with_tag("read_replica", "1").with_tag("nonvoter", "1"),
    ];
    let coordinator = coordinator(3, consensus.clone(), members, client.clone());

    let BootstrapOutcome::Bootstrapped { configuration } = coordinator.maybe_bootstrap().await
    else {
        panic!("expected bootstrap");
    };

    assert_eq!(configuration.servers.len(), 4);
    assert_eq!(configuration.voters(), 3);
    let replica = configuration.servers.iter().find(|s| s.id == "id-4").unwrap();
    assert_eq!(replica.suffrage, Suffrage::Nonvoter);
}

#[tokio::test]
async fn test_read_replicas_do_not_count_towards_quorum() {
    let consensus = Arc::new(MockConsensus::default());
    let client = Arc::new(MockPeerClient::default());
    let members = vec![server(1, 3), server(2, 3), server(3, 3).with_tag("read_replica", "1")];
    let coordinator = coordinator(3, consensus.clone(), members, client.clone());

    assert_eq!(
        coordinator.maybe_bootstrap().await,
        BootstrapOutcome::QuorumNotMet { voters: 2, expect: 3 }
    );
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn test_existing_peers_disarm_and_stop_probing() {
    let consensus = Arc::new(MockConsensus::default());
    let client = Arc::new(MockPeerClient {
        peers: HashMap::from([(rpc_addr(2), vec!["10.0.0.50:8300".to_string()])]),
        ..Default::default()
    });
    let members = vec![server(1, 3), server(2, 3), server(3, 3)];
    let coordinator = coordinator(3, consensus.clone(), members, client.clone());

    let outcome = coordinator.maybe_bootstrap().await;

    assert_eq!(outcome, BootstrapOutcome::ExistingPeers { server: "server-2".to_string() });
    assert!(!coordinator.state().is_armed());
    assert_eq!(*client.calls.lock(), vec![rpc_addr(1), rpc_addr(2)]);
    assert!(consensus.bootstraps.lock().is_empty());
}

#[tokio::test]
async fn test_bootstrap_failure_still_disarms() {
    let consensus = Arc::new(MockConsensus { fail_bootstrap: true, ..Default::default() });
    let client = Arc::new(MockPeerClient::default());
    let members = vec![server(1, 3), server(2, 3), server(3, 3)];
    let coordinator = coordinator(3, consensus.clone(), members, client.clone());

    let outcome = coordinator.maybe_bootstrap().await;

    assert!(matches!(outcome, BootstrapOutcome::BootstrapFailed { .. }));
    assert!(!coordinator.state().is_armed());
    assert_eq!(consensus.bootstraps.lock().len(), 1);

    // One-shot: no retry on the next evaluation.
    assert_eq!(coordinator.maybe_bootstrap().await, BootstrapOutcome::NotArmed);
    assert_eq!(consensus.bootstraps.lock().len(), 1);
}

#[tokio::test]
async fn test_not_armed_does_nothing() {
    let consensus = Arc::new(MockConsensus::default());
    let client = Arc::new(MockPeerClient::default());
    let members = vec![server(1, 0)];
    let coordinator = coordinator(0, consensus.clone(), members, client.clone());

    assert_eq!(coordinator.maybe_bootstrap().await, BootstrapOutcome::NotArmed);
    assert_eq!(client.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_server_counts_as_no_peers() {
    let consensus = Arc::new(MockConsensus::default());
    let client = Arc::new(MockPeerClient {
        unreachable: HashSet::from([rpc_addr(2)]),
        ..Default::default()
    });
    let members = vec![server(1, 3), server(2, 3), server(3, 3)];
    let coordinator = coordinator(3, consensus.clone(), members, client.clone());

    let start = tokio::time::Instant::now();
    let outcome = coordinator.maybe_bootstrap().await;

    let BootstrapOutcome::Bootstrapped { configuration } = outcome else {
        panic!("expected bootstrap, got {outcome:?}");
    };
    assert_eq!(configuration.servers.len(), 3);
    assert_eq!(start.elapsed(), Duration::from_secs(63));

    let calls = client.calls.lock();
    assert_eq!(calls.iter().filter(|a| **a == rpc_addr(2)).count(), 6);
    assert_eq!(calls.len(), 8);
}

#[test]
fn test_from_config() {
    let mut config = quorum_core::ServerConfig::default();
    config.bootstrap_expect = 5;

    let members: Arc<dyn MemberSource> = Arc::new(Vec::<Member>::new());
    let coordinator = BootstrapCoordinator::from_config(
        &config,
        Arc::new(MockConsensus::default()),
        members,
        Arc::new(MockPeerClient::default()),
    );

    assert_eq!(coordinator.state().expect(), 5);
    assert_eq!(coordinator.state().subscribe().expect(), 5);
}
