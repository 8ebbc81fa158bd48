//! Connection tracking for the game server
//!
//! A connection is the volatile transport-level handle of a client: one UDP
//! peer address, an id assigned by the server and the time it was last heard
//! from. Connections come and go with socket churn; durable identity lives in
//! the session registry instead, so dropping a connection here never touches
//! game state.

use log::info;
use shared::ConnectionId;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// A live connection and its activity timestamp
#[derive(Debug)]
pub struct Connection {
    /// Handle assigned by the server, never reused within a process
    pub id: ConnectionId,
    /// Peer address for sending responses
    pub addr: SocketAddr,
    /// Last time we received any packet on this connection
    pub last_seen: Instant,
}

impl Connection {
    pub fn new(id: ConnectionId, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            last_seen: Instant::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    /// Returns true if nothing was received within `timeout` before `now`
    pub fn is_timed_out(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_seen) > timeout
    }
}

/// Owns the table of open connections and enforces the capacity limit
pub struct ConnectionManager {
    connections: HashMap<ConnectionId, Connection>,
    next_connection_id: ConnectionId,
    max_connections: usize,
}

impl ConnectionManager {
    /// Connection ids start from 1 and increment for each new connection.
    pub fn new(max_connections: usize) -> Self {
        Self {
            connections: HashMap::new(),
            next_connection_id: 1,
            max_connections,
        }
    }

    /// Opens a connection for `addr`, replacing any previous one from the same address.
    ///
    /// Returns None if the server is at capacity.
    pub fn open(&mut self, addr: SocketAddr) -> Option<ConnectionId> {
        if let Some(existing) = self.find_by_addr(addr) {
            info!("Replacing connection {} from {}", existing, addr);
            self.close(existing);
        }

        if self.connections.len() >= self.max_connections {
            return None;
        }

        let connection_id = self.next_connection_id;
        self.next_connection_id += 1;

        info!("Connection {} opened from {}", connection_id, addr);
        self.connections
            .insert(connection_id, Connection::new(connection_id, addr));

        Some(connection_id)
    }

    /// Returns true if the connection was found and removed.
    pub fn close(&mut self, connection_id: ConnectionId) -> bool {
        if let Some(connection) = self.connections.remove(&connection_id) {
            info!("Connection {} closed", connection.id);
            true
        } else {
            false
        }
    }

    pub fn find_by_addr(&self, addr: SocketAddr) -> Option<ConnectionId> {
        self.connections
            .values()
            .find(|connection| connection.addr == addr)
            .map(|connection| connection.id)
    }

    pub fn addr_of(&self, connection_id: ConnectionId) -> Option<SocketAddr> {
        self.connections.get(&connection_id).map(|c| c.addr)
    }

    /// Refreshes the activity timestamp; returns false for unknown connections.
    pub fn touch(&mut self, connection_id: ConnectionId) -> bool {
        match self.connections.get_mut(&connection_id) {
            Some(connection) => {
                connection.touch();
                true
            }
            None => false,
        }
    }

    /// Removes connections silent for longer than `timeout` and returns their ids.
    pub fn check_timeouts(&mut self, now: Instant, timeout: Duration) -> Vec<ConnectionId> {
        let timed_out: Vec<ConnectionId> = self
            .connections
            .values()
            .filter(|connection| connection.is_timed_out(now, timeout))
            .map(|connection| connection.id)
            .collect();

        for connection_id in &timed_out {
            self.close(*connection_id);
        }

        timed_out
    }

    /// Resolves recipients to addresses, skipping connections that are gone.
    pub fn addrs_for(&self, connection_ids: &[ConnectionId]) -> Vec<(ConnectionId, SocketAddr)> {
        connection_ids
            .iter()
            .filter_map(|id| self.addr_of(*id).map(|addr| (*id, addr)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:8080".parse().unwrap()
    }

    fn test_addr2() -> SocketAddr {
        "127.0.0.1:8081".parse().unwrap()
    }

    #[test]
    fn test_connection_timeout() {
        let connection = Connection::new(1, test_addr());
        let now = Instant::now();

        assert!(!connection.is_timed_out(now, Duration::from_secs(1)));
        assert!(connection.is_timed_out(now + Duration::from_secs(2), Duration::from_secs(1)));
    }

    #[test]
    fn test_open_assigns_increasing_ids() {
        let mut manager = ConnectionManager::new(3);

        assert_eq!(manager.open(test_addr()), Some(1));
        assert_eq!(manager.open(test_addr2()), Some(2));
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn test_open_replaces_same_address() {
        let mut manager = ConnectionManager::new(3);

        let first = manager.open(test_addr()).unwrap();
        let second = manager.open(test_addr()).unwrap();

        assert_ne!(first, second);
        assert_eq!(manager.len(), 1);
        assert_eq!(manager.find_by_addr(test_addr()), Some(second));
        assert!(manager.addr_of(first).is_none());
    }

    #[test]
    fn test_open_at_capacity() {
        let mut manager = ConnectionManager::new(1);

        assert!(manager.open(test_addr()).is_some());
        assert!(manager.open(test_addr2()).is_none());
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_close() {
        let mut manager = ConnectionManager::new(2);
        let id = manager.open(test_addr()).unwrap();

        assert!(manager.close(id));
        assert!(!manager.close(id));
        assert!(manager.is_empty());
    }

    #[test]
    fn test_check_timeouts() {
        let mut manager = ConnectionManager::new(2);
        let id = manager.open(test_addr()).unwrap();

        let none = manager.check_timeouts(Instant::now(), Duration::from_secs(5));
        assert!(none.is_empty());

        let later = Instant::now() + Duration::from_secs(6);
        let timed_out = manager.check_timeouts(later, Duration::from_secs(5));
        assert_eq!(timed_out, vec![id]);
        assert!(manager.is_empty());
    }

    #[test]
    fn test_addrs_for_skips_missing() {
        let mut manager = ConnectionManager::new(3);
        let a = manager.open(test_addr()).unwrap();
        let b = manager.open(test_addr2()).unwrap();

        let addrs = manager.addrs_for(&[a, 99, b]);
        assert_eq!(addrs, vec![(a, test_addr()), (b, test_addr2())]);
        assert!(manager.touch(a));
        assert!(!manager.touch(99));
    }
}
