// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (c) 2025 The Quorum Authors

//! Typed server metadata decoded from gossip tags.
//!
//! A member is a server only if its tags decode cleanly; a member with a
//! malformed required tag is treated as "not a server" rather than an error,
//! since the gossip layer keeps delivering it regardless.

use std::collections::BTreeMap;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::member::{Member, MemberStatus};
use crate::tags::{
    FEATURE_FLAG_PREFIX, ROLE_SERVER, TAG_ACLS, TAG_BOOTSTRAP, TAG_BUILD, TAG_DATACENTER,
    TAG_EXPECT, TAG_ID, TAG_NONVOTER, TAG_PORT, TAG_RAFT_VSN, TAG_READ_REPLICA, TAG_ROLE,
    TAG_SEGMENT, TAG_USE_TLS, TAG_VSN, TAG_VSN_MAX, TAG_VSN_MIN, TAG_WAN_JOIN_PORT,
};
use crate::Error;

/// ACL mode advertised by a server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AclMode {
    /// ACLs are disabled.
    Disabled,
    /// ACLs are enabled.
    Enabled,
    /// Legacy ACL mode.
    Legacy,
    /// Mode not advertised or not understood.
    #[default]
    Unknown,
}

impl AclMode {
    /// Returns the tag encoding.
    #[must_use]
    pub const fn as_tag(&self) -> &'static str {
        match self {
            Self::Disabled => "0",
            Self::Enabled => "1",
            Self::Legacy => "2",
            Self::Unknown => "3",
        }
    }

    /// Decodes a tag value. Unrecognized values map to `Unknown`.
    #[must_use]
    pub fn from_tag(value: &str) -> Self {
        match value {
            "0" => Self::Disabled,
            "1" => Self::Enabled,
            "2" => Self::Legacy,
            _ => Self::Unknown,
        }
    }
}

/// The `major.minor.patch` part of a build string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BuildVersion {
    /// Major version.
    pub major: u64,
    /// Minor version.
    pub minor: u64,
    /// Patch version.
    pub patch: u64,
}

impl BuildVersion {
    /// Finds the first `N.N.N` sequence in a build string such as
    /// `"1.9.0-beta1:abcdef"`.
    #[must_use]
    pub fn find(build: &str) -> Option<Self> {
        let captures = build_version_pattern()?.captures(build)?;
        let part = |i: usize| captures.get(i)?.as_str().parse::<u64>().ok();

        Some(Self { major: part(1)?, minor: part(2)?, patch: part(3)? })
    }
}

fn build_version_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(\d+)\.(\d+)\.(\d+)").ok()).as_ref()
}

impl fmt::Display for BuildVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Validated metadata of a server, projected from a gossip member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerMetadata {
    /// Server (node) ID.
    pub id: String,
    /// Gossip node name.
    pub name: String,
    /// Node name without the `.<datacenter>` suffix used in the WAN pool.
    pub short_name: String,
    /// Datacenter name.
    pub datacenter: String,
    /// Network segment, empty for the default segment.
    pub segment: String,
    /// Server RPC port.
    pub port: u16,
    /// Server RPC address.
    pub addr: SocketAddr,
    /// Port for joining the WAN pool, if advertised.
    pub wan_join_port: Option<u16>,
    /// Raw build string.
    pub build: String,
    /// Parsed build version.
    pub build_version: BuildVersion,
    /// Wire protocol version.
    pub version: u32,
    /// Lowest supported wire protocol version, if advertised.
    pub protocol_min: Option<u32>,
    /// Highest supported wire protocol version, if advertised.
    pub protocol_max: Option<u32>,
    /// Raft protocol version (0 if not advertised).
    pub raft_version: u32,
    /// Expected bootstrap voter count (0 if not advertised).
    pub expect: u32,
    /// Whether the server runs in manual bootstrap mode.
    pub bootstrap: bool,
    /// Whether the server is a read replica (non-voting).
    pub read_replica: bool,
    /// Whether the server expects TLS on RPC.
    pub use_tls: bool,
    /// Advertised ACL mode.
    pub acls: AclMode,
    /// Advertised feature flags, keyed without the `ft_` prefix.
    pub features: BTreeMap<String, u32>,
    /// Gossip status at the time of projection.
    pub status: MemberStatus,
}

impl ServerMetadata {
    /// Projects a member into server metadata.
    ///
    /// Returns `None` if the member is not a server or any of its tags fail
    /// to decode.
    #[must_use]
    pub fn from_member(member: &Member) -> Option<Self> {
        match Self::try_from_member(member) {
            Ok(server) => server,
            Err(e) => {
                debug!(member = %member.name, error = %e, "Ignoring server member with invalid tags");
                None
            }
        }
    }

    /// Projects a member, reporting which tag failed to decode.
    ///
    /// Returns `Ok(None)` for members that are not servers at all.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidTag` if a server member carries a malformed tag.
    pub fn try_from_member(member: &Member) -> crate::Result<Option<Self>> {
        if member.tag(TAG_ROLE) != Some(ROLE_SERVER) {
            return Ok(None);
        }

        let datacenter = member.tag(TAG_DATACENTER).unwrap_or_default().to_string();
        let segment = member.tag(TAG_SEGMENT).unwrap_or_default().to_string();

        let expect = optional_tag::<u32>(member, TAG_EXPECT)?.unwrap_or(0);
        let port = required_tag::<u16>(member, TAG_PORT)?;

        let build = member.tag(TAG_BUILD).unwrap_or_default().to_string();
        let build_version = BuildVersion::find(&build)
            .ok_or_else(|| Error::InvalidTag { key: TAG_BUILD, value: build.clone() })?;

        let wan_join_port = optional_tag::<u16>(member, TAG_WAN_JOIN_PORT)?;
        let version = required_tag::<u32>(member, TAG_VSN)?;
        let protocol_min = optional_tag::<u32>(member, TAG_VSN_MIN)?;
        let protocol_max = optional_tag::<u32>(member, TAG_VSN_MAX)?;
        let raft_version = optional_tag::<u32>(member, TAG_RAFT_VSN)?.unwrap_or(0);

        let acls = member.tag(TAG_ACLS).map_or(AclMode::Unknown, AclMode::from_tag);

        let mut features = BTreeMap::new();
        for (key, value) in &member.tags {
            if let Some(feature) = key.strip_prefix(FEATURE_FLAG_PREFIX) {
                let flag = value.parse::<u32>().map_err(|_| Error::InvalidTag {
                    key: FEATURE_FLAG_PREFIX,
                    value: format!("{key}={value}"),
                })?;
                features.insert(feature.to_string(), flag);
            }
        }

        let short_name = member
            .name
            .strip_suffix(&format!(".{datacenter}"))
            .unwrap_or(&member.name)
            .to_string();

        Ok(Some(Self {
            id: member.tag(TAG_ID).unwrap_or_default().to_string(),
            name: member.name.clone(),
            short_name,
            datacenter,
            segment,
            port,
            addr: SocketAddr::new(member.addr, port),
            wan_join_port,
            build,
            build_version,
            version,
            protocol_min,
            protocol_max,
            raft_version,
            expect,
            bootstrap: member.has_tag(TAG_BOOTSTRAP),
            read_replica: member.has_tag(TAG_READ_REPLICA) || member.has_tag(TAG_NONVOTER),
            use_tls: member.has_tag(TAG_USE_TLS),
            acls,
            features,
            status: member.status,
        }))
    }

    /// Returns true if the server advertises the given feature flag.
    #[must_use]
    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.get(feature).is_some_and(|v| *v > 0)
    }

    /// Returns true if the server belongs to the default segment.
    #[must_use]
    pub fn in_default_segment(&self) -> bool {
        self.segment.is_empty()
    }
}

impl fmt::Display for ServerMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Addr: tcp/{}) (DC: {})", self.name, self.addr, self.datacenter)
    }
}

fn required_tag<T: FromStr>(member: &Member, key: &'static str) -> crate::Result<T> {
    let value = member.tag(key).unwrap_or_default();
    value.parse().map_err(|_| Error::InvalidTag { key, value: value.to_string() })
}

fn optional_tag<T: FromStr>(member: &Member, key: &'static str) -> crate::Result<Option<T>> {
    match member.tag(key) {
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| Error::InvalidTag { key, value: value.to_string() }),
        None => Ok(None),
    }
}
