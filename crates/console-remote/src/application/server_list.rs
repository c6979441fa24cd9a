//! Hosts found by discovery.

use std::fmt;
use std::net::SocketAddr;

/// One discovered console host.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerInfo {
    /// Name the host announced.
    pub identity: String,
    /// Address sessions are opened against.
    pub endpoint: SocketAddr,
}

impl fmt::Display for ServerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.identity, self.endpoint)
    }
}

/// Discovery results in arrival order, without duplicates.
///
/// Two entries are the same server only when both the identity and the
/// endpoint match: a host that changes its name, or two hosts with one name,
/// show up separately.
#[derive(Debug, Default, Clone)]
pub struct ServerList {
    servers: Vec<ServerInfo>,
}

impl ServerList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `server` unless it is already listed.  Returns `true` if added.
    pub fn insert(&mut self, server: ServerInfo) -> bool {
        if self.servers.contains(&server) {
            return false;
        }
        self.servers.push(server);
        true
    }

    pub fn clear(&mut self) {
        self.servers.clear();
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ServerInfo> {
        self.servers.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServerInfo> {
        self.servers.iter()
    }

    /// First server whose identity matches `identity` exactly.
    pub fn find_by_identity(&self, identity: &str) -> Option<&ServerInfo> {
        self.servers.iter().find(|s| s.identity == identity)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
