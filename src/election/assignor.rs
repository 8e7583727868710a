//! Primary Assignment
//!
//! Pure election run by the round leader over every submitted identity.

use std::collections::{BTreeMap, HashMap};

use crate::protocol::{Identity, Outcome};

/// Identities submitted for one round, keyed by member id
pub type RoundInput = BTreeMap<String, Identity>;

/// Elect a primary for one round
///
/// 1. Any address claimed by more than one member fails the round with
///    [`Outcome::DuplicateAddress`].
/// 2. With no eligible member the result is [`Outcome::NoCandidate`].
/// 3. Otherwise the executing member wins if it is eligible, else the
///    eligible member with the smallest id.
///
/// Identical inputs always produce identical outcomes, so followers can
/// trust the broadcast result without recomputing it.
pub fn elect(round: &RoundInput, executing_member: &str) -> Outcome {
    let mut claims: HashMap<(&str, u16), Vec<&str>> = HashMap::new();
    for (member_id, identity) in round {
        claims
            .entry(identity.address())
            .or_default()
            .push(member_id.as_str());
    }

    let mut conflicts: Vec<_> = claims
        .iter()
        .filter(|(_, members)| members.len() > 1)
        .collect();
    if !conflicts.is_empty() {
        conflicts.sort();
        for ((host, port), members) in conflicts {
            tracing::warn!(
                "Address {}:{} claimed by multiple members: {}",
                host,
                port,
                members.join(", ")
            );
        }
        return Outcome::DuplicateAddress;
    }

    let own = round
        .get_key_value(executing_member)
        .filter(|(_, identity)| identity.eligible());

    // BTreeMap iterates in member id order
    let chosen = own.or_else(|| round.iter().find(|(_, identity)| identity.eligible()));

    match chosen {
        Some((member_id, identity)) => {
            tracing::debug!("Elected {} at {} as primary", member_id, identity);
            Outcome::Primary {
                member_id: member_id.clone(),
                identity: identity.clone(),
            }
        }
        None => {
            tracing::debug!("No eligible member among {} submissions", round.len());
            Outcome::NoCandidate
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(host: &str, port: u16, eligible: bool) -> Identity {
        Identity::new(host, port, eligible).unwrap()
    }

    fn round(members: &[(&str, Identity)]) -> RoundInput {
        members
            .iter()
            .map(|(id, identity)| (id.to_string(), identity.clone()))
            .collect()
    }

    #[test]
    fn test_single_eligible_member() {
        let leader = identity("leaderHost", 8083, true);
        let outcome = elect(&round(&[("leader", leader.clone())]), "leader");

        assert!(!outcome.failed());
        assert_eq!(outcome.primary_member_id(), Some("leader"));
        assert_eq!(outcome.primary_identity(), Some(&leader));
    }

    #[test]
    fn test_single_ineligible_member() {
        let outcome = elect(
            &round(&[("leader", identity("leaderHost", 8083, false))]),
            "leader",
        );

        assert_eq!(outcome, Outcome::NoCandidate);
        assert!(!outcome.failed());
    }

    #[test]
    fn test_duplicate_address() {
        let info = identity("leaderHost", 8083, true);
        let outcome = elect(
            &round(&[("leader", info.clone()), ("member", info)]),
            "leader",
        );

        assert_eq!(outcome, Outcome::DuplicateAddress);
        assert!(outcome.failed());
        assert_eq!(outcome.primary_member_id(), None);
    }

    #[test]
    fn test_duplicate_address_ignores_eligibility() {
        // Same host and port, different eligibility, is still a conflict
        let outcome = elect(
            &round(&[
                ("a", identity("shared", 8081, true)),
                ("b", identity("shared", 8081, false)),
                ("c", identity("other", 8081, true)),
            ]),
            "c",
        );
        assert_eq!(outcome, Outcome::DuplicateAddress);
    }

    #[test]
    fn test_same_host_different_port_is_fine() {
        let outcome = elect(
            &round(&[
                ("a", identity("shared", 8081, true)),
                ("b", identity("shared", 8082, true)),
            ]),
            "a",
        );
        assert_eq!(outcome.primary_member_id(), Some("a"));
    }

    #[test]
    fn test_prefers_executing_member() {
        let input = round(&[
            ("node-a", identity("a", 8081, true)),
            ("node-b", identity("b", 8081, true)),
            ("node-c", identity("c", 8081, true)),
        ]);

        assert_eq!(elect(&input, "node-c").primary_member_id(), Some("node-c"));
        assert_eq!(elect(&input, "node-b").primary_member_id(), Some("node-b"));
    }

    #[test]
    fn test_falls_back_to_smallest_eligible_id() {
        let input = round(&[
            ("node-a", identity("a", 8081, false)),
            ("node-c", identity("c", 8081, true)),
            ("node-b", identity("b", 8081, true)),
        ]);

        // Executing member is ineligible
        assert_eq!(elect(&input, "node-a").primary_member_id(), Some("node-b"));
        // Executing member is not part of the round at all
        assert_eq!(elect(&input, "node-z").primary_member_id(), Some("node-b"));
    }

    #[test]
    fn test_empty_round() {
        assert_eq!(elect(&RoundInput::new(), "leader"), Outcome::NoCandidate);
    }

    #[test]
    fn test_deterministic() {
        let input = round(&[
            ("m-2", identity("h2", 1, true)),
            ("m-1", identity("h1", 1, true)),
            ("m-3", identity("h3", 1, false)),
        ]);

        let first = elect(&input, "m-3");
        for _ in 0..10 {
            assert_eq!(elect(&input, "m-3"), first);
        }
        assert_eq!(first.primary_member_id(), Some("m-1"));
    }
}
