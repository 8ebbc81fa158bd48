//! Runtime configuration for the game server.

use shared::{DEFAULT_MAX_ROUNDS, SESSION_SWEEP_INTERVAL_SECS, SESSION_TTL_SECS};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Maximum number of simultaneously open connections
    pub max_connections: usize,
    /// Rounds played before a room ends in game-over
    pub max_rounds: u32,
    /// Inactivity window after which a session can no longer reconnect
    pub session_ttl: Duration,
    pub session_sweep_interval: Duration,
    /// Silence after which a connection is considered gone (advisory only)
    pub connection_timeout: Duration,
    /// Inactivity window after which a whole room is discarded
    pub room_idle_timeout: Duration,
    pub room_reap_interval: Duration,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            max_connections: 256,
            max_rounds: DEFAULT_MAX_ROUNDS,
            session_ttl: Duration::from_secs(SESSION_TTL_SECS),
            session_sweep_interval: Duration::from_secs(SESSION_SWEEP_INTERVAL_SECS),
            connection_timeout: Duration::from_secs(10),
            room_idle_timeout: Duration::from_secs(30 * 60),
            room_reap_interval: Duration::from_secs(60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
        assert_eq!(config.max_rounds, 10);
        assert_eq!(config.session_ttl, Duration::from_secs(300));
        assert_eq!(config.session_sweep_interval, Duration::from_secs(60));
        assert!(config.room_idle_timeout > config.session_ttl);
    }
}
