//! Election Outcome
//!
//! The result of one election round, as computed by the round leader and
//! broadcast to every member during sync.

use serde::{Deserialize, Serialize};

use super::Identity;
use crate::error::{DecodeError, Result};

/// Round status carried on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeStatus {
    /// Round completed; there may or may not be a primary
    Ok,
    /// Two members advertised the same address
    DuplicateAddress,
}

impl OutcomeStatus {
    /// Wire code
    pub fn code(self) -> u16 {
        match self {
            OutcomeStatus::Ok => 0,
            OutcomeStatus::DuplicateAddress => 1,
        }
    }

    /// Parse a wire code
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0 => Some(OutcomeStatus::Ok),
            1 => Some(OutcomeStatus::DuplicateAddress),
            _ => None,
        }
    }
}

impl std::fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutcomeStatus::Ok => write!(f, "OK"),
            OutcomeStatus::DuplicateAddress => write!(f, "DUPLICATE_ADDRESS"),
        }
    }
}

/// Outcome of an election round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// A primary was elected
    Primary {
        member_id: String,
        identity: Identity,
    },
    /// No member was eligible; not a failure
    NoCandidate,
    /// Conflicting addresses; the round failed
    DuplicateAddress,
}

/// Flat on-wire layout; optional fields encode as presence flag + payload
#[derive(Debug, Serialize, Deserialize)]
struct AssignmentWire {
    status: u16,
    primary: Option<String>,
    primary_identity: Option<Identity>,
}

impl Outcome {
    /// Wire status of this outcome
    pub fn status(&self) -> OutcomeStatus {
        match self {
            Outcome::DuplicateAddress => OutcomeStatus::DuplicateAddress,
            _ => OutcomeStatus::Ok,
        }
    }

    /// Whether the round failed (as opposed to electing nobody)
    pub fn failed(&self) -> bool {
        self.status() != OutcomeStatus::Ok
    }

    /// Member id of the elected primary
    pub fn primary_member_id(&self) -> Option<&str> {
        match self {
            Outcome::Primary { member_id, .. } => Some(member_id),
            _ => None,
        }
    }

    /// Identity of the elected primary
    pub fn primary_identity(&self) -> Option<&Identity> {
        match self {
            Outcome::Primary { identity, .. } => Some(identity),
            _ => None,
        }
    }

    /// Check if `member_id` was elected
    pub fn is_primary(&self, member_id: &str) -> bool {
        self.primary_member_id() == Some(member_id)
    }

    /// Encode into sync assignment bytes
    pub fn encode(&self) -> Result<Vec<u8>> {
        let wire = match self {
            Outcome::Primary {
                member_id,
                identity,
            } => AssignmentWire {
                status: OutcomeStatus::Ok.code(),
                primary: Some(member_id.clone()),
                primary_identity: Some(identity.clone()),
            },
            Outcome::NoCandidate | Outcome::DuplicateAddress => AssignmentWire {
                status: self.status().code(),
                primary: None,
                primary_identity: None,
            },
        };

        super::seal(&wire)
    }

    /// Decode sync assignment bytes
    pub fn decode(bytes: &[u8]) -> std::result::Result<Self, DecodeError> {
        let wire: AssignmentWire = super::open(bytes)?;

        let status = OutcomeStatus::from_code(wire.status).ok_or_else(|| {
            DecodeError::InvalidAssignment(format!("unknown status code {}", wire.status))
        })?;

        match (status, wire.primary, wire.primary_identity) {
            (OutcomeStatus::Ok, Some(member_id), Some(identity)) => {
                if member_id.is_empty() {
                    return Err(DecodeError::InvalidAssignment(
                        "primary member id cannot be empty".into(),
                    ));
                }
                identity.check()?;
                Ok(Outcome::Primary {
                    member_id,
                    identity,
                })
            }
            (OutcomeStatus::Ok, None, None) => Ok(Outcome::NoCandidate),
            (OutcomeStatus::DuplicateAddress, None, None) => Ok(Outcome::DuplicateAddress),
            (OutcomeStatus::DuplicateAddress, _, _) => Err(DecodeError::InvalidAssignment(
                "duplicate address outcome cannot name a primary".into(),
            )),
            _ => Err(DecodeError::InvalidAssignment(
                "primary member id and identity must be both present or both absent".into(),
            )),
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Primary {
                member_id,
                identity,
            } => write!(f, "primary {} at {}", member_id, identity),
            Outcome::NoCandidate => write!(f, "no eligible primary"),
            Outcome::DuplicateAddress => write!(f, "failed: duplicate address"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::MAX_HOST_LEN;
    use proptest::prelude::*;

    fn leader_info() -> Identity {
        Identity::new("leaderHost", 8083, true).unwrap()
    }

    fn identity_strategy() -> impl Strategy<Value = Identity> {
        let host = prop_oneof!["[a-z0-9][a-z0-9.-]{0,62}", "\\PC{1,63}", "[a-z]{255}"];
        (host, any::<u16>(), any::<bool>()).prop_map(|(host, port, eligible)| {
            assert!(host.len() <= MAX_HOST_LEN);
            Identity::new(host, port, eligible).unwrap()
        })
    }

    fn outcome_strategy() -> impl Strategy<Value = Outcome> {
        prop_oneof![
            ("\\PC{1,64}", identity_strategy())
                .prop_map(|(member_id, identity)| Outcome::Primary { member_id, identity }),
            Just(Outcome::NoCandidate),
            Just(Outcome::DuplicateAddress),
        ]
    }

    proptest! {
        #[test]
        fn test_outcome_round_trip_any(outcome in outcome_strategy()) {
            let bytes = outcome.encode().unwrap();
            let decoded = Outcome::decode(&bytes).unwrap();
            prop_assert_eq!(decoded.status(), outcome.status());
            prop_assert_eq!(decoded, outcome);
        }
    }

    #[test]
    fn test_outcome_round_trip() {
        let outcomes = [
            Outcome::Primary {
                member_id: "leader".to_string(),
                identity: leader_info(),
            },
            Outcome::NoCandidate,
            Outcome::DuplicateAddress,
        ];

        for outcome in outcomes {
            let bytes = outcome.encode().unwrap();
            assert_eq!(Outcome::decode(&bytes).unwrap(), outcome);
        }
    }

    #[test]
    fn test_failed_predicate() {
        assert!(Outcome::DuplicateAddress.failed());
        assert!(!Outcome::NoCandidate.failed());

        let elected = Outcome::Primary {
            member_id: "leader".to_string(),
            identity: leader_info(),
        };
        assert!(!elected.failed());
        assert!(elected.is_primary("leader"));
        assert_eq!(elected.primary_identity(), Some(&leader_info()));
        assert_eq!(Outcome::NoCandidate.primary_member_id(), None);
        assert_eq!(Outcome::DuplicateAddress.primary_identity(), None);
    }

    #[test]
    fn test_absent_fields_are_compact() {
        let empty = Outcome::NoCandidate.encode().unwrap();
        let elected = Outcome::Primary {
            member_id: "leader".to_string(),
            identity: leader_info(),
        }
        .encode()
        .unwrap();

        // status (2) + two absent option flags (1 + 1)
        assert_eq!(empty.len(), crate::protocol::EnvelopeHeader::SIZE + 4);
        assert!(elected.len() > empty.len());
    }

    #[test]
    fn test_decode_rejects_half_present_primary() {
        let wire = AssignmentWire {
            status: OutcomeStatus::Ok.code(),
            primary: Some("leader".to_string()),
            primary_identity: None,
        };
        let bytes = crate::protocol::seal(&wire).unwrap();
        assert!(matches!(
            Outcome::decode(&bytes),
            Err(DecodeError::InvalidAssignment(_))
        ));
    }

    #[test]
    fn test_decode_rejects_failed_round_with_primary() {
        let wire = AssignmentWire {
            status: OutcomeStatus::DuplicateAddress.code(),
            primary: Some("leader".to_string()),
            primary_identity: Some(leader_info()),
        };
        let bytes = crate::protocol::seal(&wire).unwrap();
        assert!(matches!(
            Outcome::decode(&bytes),
            Err(DecodeError::InvalidAssignment(_))
        ));
    }

    #[test]
    fn test_decode_rejects_unknown_status() {
        let wire = AssignmentWire {
            status: 42,
            primary: None,
            primary_identity: None,
        };
        let bytes = crate::protocol::seal(&wire).unwrap();
        assert!(matches!(
            Outcome::decode(&bytes),
            Err(DecodeError::InvalidAssignment(_))
        ));
    }

    #[test]
    fn test_identity_blob_is_not_an_outcome() {
        let bytes = leader_info().encode().unwrap();
        assert!(Outcome::decode(&bytes).is_err());
    }

    #[test]
    fn test_status_codes() {
        for status in [OutcomeStatus::Ok, OutcomeStatus::DuplicateAddress] {
            assert_eq!(OutcomeStatus::from_code(status.code()), Some(status));
        }
        assert_eq!(OutcomeStatus::from_code(2), None);
        assert_eq!(OutcomeStatus::DuplicateAddress.to_string(), "DUPLICATE_ADDRESS");
    }
}
