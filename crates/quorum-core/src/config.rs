// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (c) 2025 The Quorum Authors

//! Configuration management for Quorum.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, PROTOCOL_VERSION_MAX, PROTOCOL_VERSION_MIN};

/// Default capacity of the leader reconciliation queue.
pub const DEFAULT_RECONCILE_QUEUE_SIZE: usize = 256;

/// Default server RPC port.
pub const DEFAULT_RPC_PORT: u16 = 8300;

/// Main configuration for a Quorum server.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Server identity and bootstrap configuration.
    pub server: ServerConfig,
    /// TLS configuration.
    pub tls: TlsConfig,
    /// Leader reconciliation configuration.
    pub reconcile: ReconcileConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(Error::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string cannot be parsed.
    pub fn parse(content: &str) -> crate::Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Checks the configuration for values the server cannot run with.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` describing the first problem found.
    pub fn validate(&self) -> crate::Result<()> {
        let server = &self.server;

        if server.datacenter.is_empty() {
            return Err(Error::config("datacenter must not be empty"));
        }
        if server.node_name.is_empty() {
            return Err(Error::config("node_name must not be empty"));
        }
        if !(PROTOCOL_VERSION_MIN..=PROTOCOL_VERSION_MAX).contains(&server.protocol_version) {
            return Err(Error::config(format!(
                "protocol_version {} outside supported range [{}, {}]",
                server.protocol_version, PROTOCOL_VERSION_MIN, PROTOCOL_VERSION_MAX
            )));
        }
        if server.bootstrap && server.bootstrap_expect != 0 {
            return Err(Error::config("bootstrap and bootstrap_expect are mutually exclusive"));
        }
        if self.reconcile.queue_size == 0 {
            return Err(Error::config("reconcile.queue_size must be at least 1"));
        }

        Ok(())
    }
}

/// Server identity and bootstrap configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Datacenter this server belongs to.
    pub datacenter: String,
    /// Gossip node name.
    pub node_name: String,
    /// Stable node ID, advertised as the `id` tag.
    pub node_id: String,
    /// Manual bootstrap mode: this server forms a single-node cluster on its own.
    pub bootstrap: bool,
    /// Number of voting servers to wait for before bootstrapping (0 disables).
    pub bootstrap_expect: u32,
    /// Whether this server is a read replica (non-voting).
    pub read_replica: bool,
    /// Wire protocol version spoken by this server.
    pub protocol_version: u8,
    /// Raft protocol version.
    pub raft_protocol_version: u8,
    /// Build version string, advertised as the `build` tag.
    pub build: String,
    /// TCP port of the server RPC listener.
    pub rpc_port: u16,
    /// Port other servers should use to join the WAN pool, if any.
    pub wan_join_port: Option<u16>,
    /// Whether ACLs are enabled on this server.
    pub acls_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            datacenter: "dc1".to_string(),
            node_name: "quorum-server".to_string(),
            node_id: String::new(),
            bootstrap: false,
            bootstrap_expect: 0,
            read_replica: false,
            protocol_version: PROTOCOL_VERSION_MIN,
            raft_protocol_version: 3,
            build: env!("CARGO_PKG_VERSION").to_string(),
            rpc_port: DEFAULT_RPC_PORT,
            wan_join_port: None,
            acls_enabled: false,
        }
    }
}

/// TLS configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    /// Path to a CA certificate file.
    pub ca_file: Option<PathBuf>,
    /// Path to a directory of CA certificates.
    pub ca_path: Option<PathBuf>,
}

impl TlsConfig {
    /// Returns true if TLS is configured for server RPC.
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.ca_file.is_some() || self.ca_path.is_some()
    }
}

/// Leader reconciliation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Capacity of the bounded reconciliation queue. Items beyond it are dropped.
    pub queue_size: usize,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self { queue_size: DEFAULT_RECONCILE_QUEUE_SIZE }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format.
    #[default]
    Pretty,
    /// JSON format.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,
    /// Log output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::Pretty }
    }
}
