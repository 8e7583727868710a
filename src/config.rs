//! WolfElect Configuration
//!
//! This module provides configuration structures for a node taking part
//! in primary election.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::protocol::Identity;

/// Main WolfElect configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectorConfig {
    /// Node-specific configuration
    pub node: NodeConfig,

    /// Group membership configuration
    #[serde(default)]
    pub group: GroupConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Local fleet simulation
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Node-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Client identifier; the engine derives member ids from it
    pub id: String,

    /// Host other nodes use to reach this one
    pub host: String,

    /// Port other nodes use to reach this one
    pub port: u16,

    /// Whether this node may be elected primary
    #[serde(default = "default_true")]
    pub eligible: bool,
}

/// Group membership configuration, handed to the membership engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupConfig {
    /// Group all nodes of the service join
    #[serde(default = "default_group_id")]
    pub group_id: String,

    /// Session timeout in milliseconds
    #[serde(default = "default_session_timeout_ms")]
    pub session_timeout_ms: u64,

    /// Rebalance timeout in milliseconds
    #[serde(default = "default_rebalance_timeout_ms")]
    pub rebalance_timeout_ms: u64,

    /// Heartbeat interval in milliseconds
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,

    /// Backoff before retrying a failed round in milliseconds
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Peers simulated alongside this node
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default)]
    pub peers: Vec<PeerConfig>,
}

/// One simulated peer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerConfig {
    pub id: String,
    pub host: String,
    pub port: u16,
    #[serde(default = "default_true")]
    pub eligible: bool,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_group_id() -> String {
    "wolfelect".to_string()
}

fn default_session_timeout_ms() -> u64 {
    10_000
}

fn default_rebalance_timeout_ms() -> u64 {
    300_000
}

fn default_heartbeat_interval_ms() -> u64 {
    3_000
}

fn default_retry_backoff_ms() -> u64 {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            group_id: default_group_id(),
            session_timeout_ms: default_session_timeout_ms(),
            rebalance_timeout_ms: default_rebalance_timeout_ms(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl ElectorConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_str(content: &str) -> crate::Result<Self> {
        let config: ElectorConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.node.id.is_empty() {
            return Err(crate::Error::Config("node.id cannot be empty".into()));
        }

        if self.node.host.is_empty() {
            return Err(crate::Error::Config("node.host cannot be empty".into()));
        }

        if self.node.host.len() > crate::protocol::MAX_HOST_LEN {
            return Err(crate::Error::Config(format!(
                "node.host cannot exceed {} bytes",
                crate::protocol::MAX_HOST_LEN
            )));
        }

        if self.node.port == 0 {
            return Err(crate::Error::Config("node.port cannot be 0".into()));
        }

        if self.group.group_id.is_empty() {
            return Err(crate::Error::Config("group.group_id cannot be empty".into()));
        }

        if self.group.heartbeat_interval_ms >= self.group.session_timeout_ms {
            return Err(crate::Error::Config(format!(
                "group.heartbeat_interval_ms ({}) must be below group.session_timeout_ms ({})",
                self.group.heartbeat_interval_ms, self.group.session_timeout_ms
            )));
        }

        for peer in &self.simulation.peers {
            if peer.id.is_empty() || peer.host.is_empty() {
                return Err(crate::Error::Config(
                    "simulation peers need an id and a host".into(),
                ));
            }
        }

        Ok(())
    }

    /// Identity this node advertises
    pub fn identity(&self) -> crate::Result<Identity> {
        Identity::new(self.node.host.clone(), self.node.port, self.node.eligible)
    }

    /// Identities of the simulated peers, keyed by client id
    pub fn peer_identities(&self) -> crate::Result<Vec<(String, Identity)>> {
        self.simulation
            .peers
            .iter()
            .map(|peer| {
                Identity::new(peer.host.clone(), peer.port, peer.eligible)
                    .map(|identity| (peer.id.clone(), identity))
            })
            .collect()
    }

    /// Get heartbeat interval as Duration
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.group.heartbeat_interval_ms)
    }

    /// Get session timeout as Duration
    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.group.session_timeout_ms)
    }

    /// Get rebalance timeout as Duration
    pub fn rebalance_timeout(&self) -> Duration {
        Duration::from_millis(self.group.rebalance_timeout_ms)
    }

    /// Get retry backoff as Duration
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.group.retry_backoff_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
[node]
id = "registry-1"
host = "registry-1.internal"
port = 8081

[group]
group_id = "schema-registry"
heartbeat_interval_ms = 2000

[[simulation.peers]]
id = "registry-2"
host = "registry-2.internal"
port = 8081
eligible = false
"#;

    #[test]
    fn test_parse_config() {
        let config = ElectorConfig::from_str(SAMPLE).unwrap();
        assert_eq!(config.node.id, "registry-1");
        assert!(config.node.eligible);
        assert_eq!(config.group.group_id, "schema-registry");
        assert_eq!(config.group.session_timeout_ms, 10_000);
        assert_eq!(config.heartbeat_interval(), Duration::from_secs(2));
        assert_eq!(config.logging.level, "info");

        let identity = config.identity().unwrap();
        assert_eq!(identity.address(), ("registry-1.internal", 8081));

        let peers = config.peer_identities().unwrap();
        assert_eq!(peers.len(), 1);
        assert_eq!(peers[0].0, "registry-2");
        assert!(!peers[0].1.eligible());
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = ElectorConfig::from_str(
            r#"
[node]
id = "n"
host = "h"
port = 1
"#,
        )
        .unwrap();

        assert_eq!(config.group.group_id, "wolfelect");
        assert_eq!(config.retry_backoff(), Duration::from_millis(100));
        assert!(config.simulation.peers.is_empty());
    }

    #[test]
    fn test_validation_errors() {
        let empty_host = SAMPLE.replace("host = \"registry-1.internal\"", "host = \"\"");
        assert!(matches!(
            ElectorConfig::from_str(&empty_host),
            Err(crate::Error::Config(_))
        ));

        let long_host = SAMPLE.replace(
            "host = \"registry-1.internal\"",
            &format!("host = \"{}\"", "h".repeat(256)),
        );
        assert!(matches!(
            ElectorConfig::from_str(&long_host),
            Err(crate::Error::Config(_))
        ));

        let slow_heartbeat = SAMPLE.replace("heartbeat_interval_ms = 2000", "heartbeat_interval_ms = 20000");
        assert!(matches!(
            ElectorConfig::from_str(&slow_heartbeat),
            Err(crate::Error::Config(_))
        ));

        assert!(matches!(
            ElectorConfig::from_str("[node]\nid = 3"),
            Err(crate::Error::ConfigParse(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = ElectorConfig::from_file(file.path()).unwrap();
        assert_eq!(config.node.port, 8081);

        let missing = ElectorConfig::from_file(std::path::Path::new("/nonexistent/wolfelect.toml"));
        assert!(matches!(missing, Err(crate::Error::Io(_))));
    }
}
