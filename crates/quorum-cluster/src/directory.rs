// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (c) 2025 The Quorum Authors

//! Directory of known Raft-capable servers.
//!
//! The membership dispatcher is the only writer. RPC routing reads the
//! directory concurrently through cheap clones sharing the same map.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use metrics::{counter, gauge};
use parking_lot::RwLock;
use quorum_core::ServerMetadata;
use thiserror::Error;

/// Errors returned by directory lookups.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DirectoryError {
    /// No server with this ID is known.
    #[error("could not find address for server id {0}")]
    UnknownServer(String),
}

#[derive(Debug, Default)]
struct Entries {
    by_id: HashMap<String, Arc<ServerMetadata>>,
    by_addr: HashMap<SocketAddr, Arc<ServerMetadata>>,
}

/// Concurrent map from server ID (and RPC address) to server metadata.
#[derive(Debug, Clone, Default)]
pub struct ServerDirectory {
    entries: Arc<RwLock<Entries>>,
}

impl ServerDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the entry for `server.id`.
    pub fn add(&self, server: ServerMetadata) {
        let server = Arc::new(server);
        let mut entries = self.entries.write();

        if let Some(previous) = entries.by_id.insert(server.id.clone(), Arc::clone(&server)) {
            if previous.addr != server.addr {
                remove_addr(&mut entries.by_addr, &previous.addr, &previous.id);
            }
        }
        entries.by_addr.insert(server.addr, server);

        counter!("quorum_directory_adds_total").increment(1);
        gauge!("quorum_directory_servers").set(entries.by_id.len() as f64);
    }

    /// Removes the entry for `server.id`, if any.
    pub fn remove(&self, server: &ServerMetadata) {
        let mut entries = self.entries.write();

        if let Some(previous) = entries.by_id.remove(&server.id) {
            remove_addr(&mut entries.by_addr, &previous.addr, &previous.id);
        }
        remove_addr(&mut entries.by_addr, &server.addr, &server.id);

        counter!("quorum_directory_removes_total").increment(1);
        gauge!("quorum_directory_servers").set(entries.by_id.len() as f64);
    }

    /// Returns the server with the given ID.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<ServerMetadata>> {
        self.entries.read().by_id.get(id).cloned()
    }

    /// Returns the RPC address of the server with the given ID.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::UnknownServer` if the ID is not present.
    pub fn server_addr(&self, id: &str) -> Result<SocketAddr, DirectoryError> {
        self.entries
            .read()
            .by_id
            .get(id)
            .map(|s| s.addr)
            .ok_or_else(|| DirectoryError::UnknownServer(id.to_string()))
    }

    /// Returns the server listening on the given RPC address.
    #[must_use]
    pub fn server(&self, addr: &SocketAddr) -> Option<Arc<ServerMetadata>> {
        self.entries.read().by_addr.get(addr).cloned()
    }

    /// Returns all known servers.
    #[must_use]
    pub fn servers(&self) -> Vec<Arc<ServerMetadata>> {
        self.entries.read().by_id.values().cloned().collect()
    }

    /// Returns the number of known servers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().by_id.len()
    }

    /// Returns true if no servers are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Removes the address entry only if `id` still owns it.
fn remove_addr(
    by_addr: &mut HashMap<SocketAddr, Arc<ServerMetadata>>,
    addr: &SocketAddr,
    id: &str,
) {
    if by_addr.get(addr).is_some_and(|s| s.id == id) {
        by_addr.remove(addr);
    }
}
