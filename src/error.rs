//! WolfElect Error Types

use thiserror::Error;

/// Result type alias for WolfElect operations
pub type Result<T> = std::result::Result<T, Error>;

/// WolfElect error types
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Protocol errors
    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),

    #[error("Protocol decode error: {0}")]
    ProtocolDecode(#[from] DecodeError),

    #[error("Protocol encode error: {0}")]
    ProtocolEncode(#[from] bincode::Error),

    // Round errors
    #[error("Stale epoch {epoch}: last assigned epoch is {last}")]
    StaleEpoch { epoch: u64, last: u64 },

    #[error("Member {member_id} speaks protocol {found}, group expects {expected}")]
    InconsistentProtocol {
        member_id: String,
        expected: String,
        found: String,
    },

    #[error("No assignment produced for member {0}")]
    MissingAssignment(String),

    #[error("Unknown member: {0}")]
    UnknownMember(String),

    #[error("Not round leader: round leader is {0}")]
    NotRoundLeader(String),

    #[error("Group has no members")]
    EmptyGroup,
}

impl Error {
    /// Check if a fresh round may succeed where this one failed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::ProtocolDecode(_) | Error::StaleEpoch { .. } | Error::MissingAssignment(_)
        )
    }

    /// Check if this error means the node must rejoin the group
    pub fn requires_rejoin(&self) -> bool {
        matches!(
            self,
            Error::ProtocolDecode(_)
                | Error::StaleEpoch { .. }
                | Error::MissingAssignment(_)
                | Error::NotRoundLeader(_)
        )
    }
}

/// Failure to decode an identity or assignment blob
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("truncated input: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    #[error("unsupported format version {0}")]
    UnsupportedVersion(u16),

    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("payload checksum mismatch")]
    ChecksumMismatch,

    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    #[error("invalid assignment: {0}")]
    InvalidAssignment(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_display() {
        let err = Error::from(DecodeError::UnsupportedVersion(9));
        assert_eq!(
            err.to_string(),
            "Protocol decode error: unsupported format version 9"
        );

        let err = DecodeError::Truncated { needed: 10, available: 3 };
        assert!(err.to_string().contains("needed 10 bytes"));
    }

    #[test]
    fn test_retry_classification() {
        assert!(Error::from(DecodeError::ChecksumMismatch).is_retryable());
        assert!(Error::StaleEpoch { epoch: 1, last: 2 }.requires_rejoin());
        assert!(Error::NotRoundLeader("node-2".into()).requires_rejoin());
        assert!(!Error::EmptyGroup.is_retryable());
        assert!(!Error::Config("bad".into()).requires_rejoin());
    }

    #[test]
    fn test_json_error_conversion() {
        fn parse(input: &str) -> Result<serde_json::Value> {
            Ok(serde_json::from_str(input)?)
        }

        let err = parse("{not json").unwrap_err();
        assert!(matches!(err, Error::Json(_)));
        assert!(err.to_string().starts_with("JSON error:"));
        assert!(!err.is_retryable());
    }
}
