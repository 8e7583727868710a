//! Node Identity
//!
//! The address and primary eligibility a node advertises when it joins
//! the group.

use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, Error, Result};

/// Longest host accepted, in bytes (DNS name limit)
pub const MAX_HOST_LEN: usize = 255;

/// A node's advertised identity
///
/// Equality is structural over host, port and eligibility.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    host: String,
    port: u16,
    eligible: bool,
}

impl Identity {
    /// Create a new identity; the host must be 1 to [`MAX_HOST_LEN`] bytes
    pub fn new(host: impl Into<String>, port: u16, eligible: bool) -> Result<Self> {
        let host = host.into();
        if let Some(reason) = host_problem(&host) {
            return Err(Error::InvalidIdentity(reason));
        }

        Ok(Self {
            host,
            port,
            eligible,
        })
    }

    /// Advertised host
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Advertised port
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Whether this node may be elected primary
    pub fn eligible(&self) -> bool {
        self.eligible
    }

    /// Reachable address as (host, port)
    pub fn address(&self) -> (&str, u16) {
        (&self.host, self.port)
    }

    /// Encode into join metadata
    pub fn encode(&self) -> Result<Vec<u8>> {
        super::seal(self)
    }

    /// Decode join metadata
    pub fn decode(bytes: &[u8]) -> std::result::Result<Self, DecodeError> {
        let identity: Identity = super::open(bytes)?;
        identity.check()?;
        Ok(identity)
    }

    pub(crate) fn check(&self) -> std::result::Result<(), DecodeError> {
        match host_problem(&self.host) {
            Some(reason) => Err(DecodeError::InvalidIdentity(reason)),
            None => Ok(()),
        }
    }
}

fn host_problem(host: &str) -> Option<String> {
    if host.is_empty() {
        return Some("host cannot be empty".into());
    }
    if host.len() > MAX_HOST_LEN {
        return Some(format!(
            "host is {} bytes, limit is {}",
            host.len(),
            MAX_HOST_LEN
        ));
    }
    None
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
