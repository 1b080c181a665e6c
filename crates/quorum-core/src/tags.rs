// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (c) 2025 The Quorum Authors

//! Gossip tag contract advertised by servers.
//!
//! Key names and value encodings are compatibility-critical: every server in
//! a pool reads the tags written here through
//! [`ServerMetadata::from_member`](crate::ServerMetadata::from_member), and
//! older servers read them too.
//!
//! ```text
//! role=consul dc=dc1 segment= id=<uuid> vsn=2 vsn_min=2 vsn_max=3 raft_vsn=3
//! build=1.9.0 port=8300 [bootstrap=1] [expect=3] [nonvoter=1 read_replica=1]
//! [use_tls=1] acls=0|1 ft_fs=1 ft_si=1 [wan_join_port=8302]
//! ```

use std::collections::BTreeMap;
use std::net::IpAddr;

use crate::config::Config;
use crate::member::Member;
use crate::metadata::AclMode;
use crate::{PROTOCOL_VERSION_MAX, PROTOCOL_VERSION_MIN};

/// Tag holding the node role.
pub const TAG_ROLE: &str = "role";
/// Role value identifying a server.
pub const ROLE_SERVER: &str = "consul";
/// Tag holding the datacenter name.
pub const TAG_DATACENTER: &str = "dc";
/// Tag holding the network segment (empty for the default segment).
pub const TAG_SEGMENT: &str = "segment";
/// Tag holding the node ID.
pub const TAG_ID: &str = "id";
/// Tag holding the wire protocol version.
pub const TAG_VSN: &str = "vsn";
/// Tag holding the lowest supported wire protocol version.
pub const TAG_VSN_MIN: &str = "vsn_min";
/// Tag holding the highest supported wire protocol version.
pub const TAG_VSN_MAX: &str = "vsn_max";
/// Tag holding the Raft protocol version.
pub const TAG_RAFT_VSN: &str = "raft_vsn";
/// Tag holding the build version string.
pub const TAG_BUILD: &str = "build";
/// Tag holding the server RPC port.
pub const TAG_PORT: &str = "port";
/// Present when the server runs in manual bootstrap mode.
pub const TAG_BOOTSTRAP: &str = "bootstrap";
/// Tag holding the expected number of bootstrap voters.
pub const TAG_EXPECT: &str = "expect";
/// Legacy read-replica marker, still written for older readers.
pub const TAG_NONVOTER: &str = "nonvoter";
/// Present when the server is a read replica.
pub const TAG_READ_REPLICA: &str = "read_replica";
/// Present when the server expects TLS on RPC.
pub const TAG_USE_TLS: &str = "use_tls";
/// Tag holding the ACL mode.
pub const TAG_ACLS: &str = "acls";
/// Tag holding the port used to join the WAN pool.
pub const TAG_WAN_JOIN_PORT: &str = "wan_join_port";
/// Prefix shared by all feature-advertisement tags.
pub const FEATURE_FLAG_PREFIX: &str = "ft_";
/// Feature flag: federation states are supported.
pub const FEATURE_FEDERATION_STATES: &str = "ft_fs";
/// Feature flag: service intentions are supported.
pub const FEATURE_SERVICE_INTENTIONS: &str = "ft_si";

const FLAG_SET: &str = "1";

/// The gossip pool a set of tags is built for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GossipPool {
    /// The datacenter-local pool, optionally scoped to a network segment.
    Lan {
        /// Segment name, empty for the default segment.
        segment: String,
    },
    /// The cross-datacenter pool of servers.
    Wan,
}

impl GossipPool {
    /// The default LAN segment.
    #[must_use]
    pub fn lan() -> Self {
        Self::Lan { segment: String::new() }
    }

    fn segment(&self) -> &str {
        match self {
            Self::Lan { segment } => segment,
            Self::Wan => "",
        }
    }
}

/// The gossip identity a server advertises into one pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerTags {
    node_name: String,
    tags: BTreeMap<String, String>,
}

impl ServerTags {
    /// Builds the node name and tags for the given pool.
    #[must_use]
    pub fn build(config: &Config, pool: &GossipPool) -> Self {
        let server = &config.server;
        let mut tags = BTreeMap::new();

        let node_name = match pool {
            GossipPool::Wan => format!("{}.{}", server.node_name, server.datacenter),
            GossipPool::Lan { .. } => {
                if let Some(port) = server.wan_join_port.filter(|p| *p > 0) {
                    tags.insert(TAG_WAN_JOIN_PORT.to_string(), port.to_string());
                }
                server.node_name.clone()
            }
        };

        tags.insert(TAG_ROLE.to_string(), ROLE_SERVER.to_string());
        tags.insert(TAG_DATACENTER.to_string(), server.datacenter.clone());
        tags.insert(TAG_SEGMENT.to_string(), pool.segment().to_string());
        tags.insert(TAG_ID.to_string(), server.node_id.clone());
        tags.insert(TAG_VSN.to_string(), server.protocol_version.to_string());
        tags.insert(TAG_VSN_MIN.to_string(), PROTOCOL_VERSION_MIN.to_string());
        tags.insert(TAG_VSN_MAX.to_string(), PROTOCOL_VERSION_MAX.to_string());
        tags.insert(TAG_RAFT_VSN.to_string(), server.raft_protocol_version.to_string());
        tags.insert(TAG_BUILD.to_string(), server.build.clone());
        tags.insert(TAG_PORT.to_string(), server.rpc_port.to_string());

        if server.bootstrap {
            tags.insert(TAG_BOOTSTRAP.to_string(), FLAG_SET.to_string());
        }
        if server.bootstrap_expect != 0 {
            tags.insert(TAG_EXPECT.to_string(), server.bootstrap_expect.to_string());
        }
        if server.read_replica {
            // Both keys: servers predating read_replica only understand nonvoter.
            tags.insert(TAG_NONVOTER.to_string(), FLAG_SET.to_string());
            tags.insert(TAG_READ_REPLICA.to_string(), FLAG_SET.to_string());
        }
        if config.tls.enabled() {
            tags.insert(TAG_USE_TLS.to_string(), FLAG_SET.to_string());
        }

        let acls = if server.acls_enabled { AclMode::Enabled } else { AclMode::Disabled };
        tags.insert(TAG_ACLS.to_string(), acls.as_tag().to_string());

        tags.insert(FEATURE_FEDERATION_STATES.to_string(), FLAG_SET.to_string());
        tags.insert(FEATURE_SERVICE_INTENTIONS.to_string(), FLAG_SET.to_string());

        Self { node_name, tags }
    }

    /// Returns the gossip node name.
    #[must_use]
    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    /// Returns the tag map.
    #[must_use]
    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    /// Consumes the builder, returning the tag map.
    #[must_use]
    pub fn into_tags(self) -> BTreeMap<String, String> {
        self.tags
    }

    /// Returns the member other nodes would observe for this server.
    #[must_use]
    pub fn to_member(&self, addr: IpAddr, gossip_port: u16) -> Member {
        Member::new(self.node_name.clone(), addr, gossip_port).with_tags(self.tags.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TlsConfig;
    use crate::metadata::ServerMetadata;

    fn test_config() -> Config {
        let mut config = Config::default();
        config.server.datacenter = "dc1".to_string();
        config.server.node_name = "server-1".to_string();
        config.server.node_id = "0b2f1c9e-7a33-4f0e-9d7c-2c8b5b1f4e11".to_string();
        config.server.build = "1.9.0".to_string();
        config
    }

    #[test]
    fn test_lan_tags() {
        let tags = ServerTags::build(&test_config(), &GossipPool::lan());
        let t = tags.tags();

        assert_eq!(tags.node_name(), "server-1");
        assert_eq!(t["role"], "consul");
        assert_eq!(t["dc"], "dc1");
        assert_eq!(t["segment"], "");
        assert_eq!(t["id"], "0b2f1c9e-7a33-4f0e-9d7c-2c8b5b1f4e11");
        assert_eq!(t["vsn"], "2");
        assert_eq!(t["vsn_min"], "2");
        assert_eq!(t["vsn_max"], "3");
        assert_eq!(t["raft_vsn"], "3");
        assert_eq!(t["build"], "1.9.0");
        assert_eq!(t["port"], "8300");
        assert_eq!(t["acls"], "0");
        assert_eq!(t["ft_fs"], "1");
        assert_eq!(t["ft_si"], "1");
        for absent in ["bootstrap", "expect", "nonvoter", "read_replica", "use_tls"] {
            assert!(!t.contains_key(absent), "unexpected tag {absent}");
        }
        assert!(!t.contains_key("wan_join_port"));
    }

    #[test]
    fn test_optional_tags() {
        let mut config = test_config();
        config.server.bootstrap_expect = 3;
        config.server.read_replica = true;
        config.server.acls_enabled = true;
        config.server.wan_join_port = Some(8302);
        config.tls = TlsConfig { ca_path: Some("/etc/quorum/ca".into()), ..Default::default() };

        let tags = ServerTags::build(&config, &GossipPool::lan()).into_tags();

        assert_eq!(tags["expect"], "3");
        assert_eq!(tags["nonvoter"], "1");
        assert_eq!(tags["read_replica"], "1");
        assert_eq!(tags["use_tls"], "1");
        assert_eq!(tags["acls"], "1");
        assert_eq!(tags["wan_join_port"], "8302");
    }

    #[test]
    fn test_manual_bootstrap_tag() {
        let mut config = test_config();
        config.server.bootstrap = true;

        let tags = ServerTags::build(&config, &GossipPool::lan()).into_tags();
        assert_eq!(tags["bootstrap"], "1");
    }

    #[test]
    fn test_wan_pool_identity() {
        let mut config = test_config();
        config.server.wan_join_port = Some(8302);

        let tags = ServerTags::build(&config, &GossipPool::Wan);

        assert_eq!(tags.node_name(), "server-1.dc1");
        assert!(!tags.tags().contains_key("wan_join_port"));
        assert_eq!(tags.tags()["segment"], "");
    }

    #[test]
    fn test_segment_tag() {
        let pool = GossipPool::Lan { segment: "alpha".to_string() };
        let tags = ServerTags::build(&test_config(), &pool);
        assert_eq!(tags.tags()["segment"], "alpha");
    }

    #[test]
    fn test_advertised_tags_validate_as_server() {
        let mut config = test_config();
        config.server.bootstrap_expect = 3;
        config.server.read_replica = true;

        let member = ServerTags::build(&config, &GossipPool::lan())
            .to_member("10.0.0.1".parse().unwrap(), 8301);
        let meta = ServerMetadata::from_member(&member).expect("own tags must validate");

        assert_eq!(meta.id, config.server.node_id);
        assert_eq!(meta.expect, 3);
        assert!(meta.read_replica);
        assert_eq!(meta.addr, "10.0.0.1:8300".parse().unwrap());
        assert_eq!(meta.acls, AclMode::Disabled);
    }
}
