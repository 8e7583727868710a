//! In-Process Group
//!
//! Runs join/sync rounds over a set of [`GroupProtocol`] members held in
//! memory. It stands in for a networked membership engine in tests and in
//! the simulator: no heartbeats, no timeouts, rounds run when asked.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::GroupProtocol;
use crate::election::Epoch;
use crate::error::{Error, Result};

/// What happened in one round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSummary {
    /// Generation the round ran as
    pub generation: Epoch,
    /// Member that computed the outcome
    pub leader_id: String,
    /// Sub-protocol selected by the round leader
    pub sub_protocol: String,
    /// Members that took part, in join order
    pub members: Vec<String>,
    /// Members left out (foreign sub-protocol or no metadata)
    pub excluded: Vec<String>,
    /// Members that rejected their assignment
    pub failed: Vec<String>,
}

/// In-memory group membership engine
pub struct LocalGroup<P: GroupProtocol> {
    /// Group identifier
    group_id: String,
    /// Protocol family every member must speak
    protocol_type: String,
    /// Current members by member id
    members: BTreeMap<String, P>,
    /// Member ids, oldest first
    join_order: Vec<String>,
    /// Last generation handed out
    generation: Epoch,
    /// Round leader of the last round
    leader_id: Option<String>,
    /// Membership changed since the last round
    rebalance_needed: bool,
}

impl<P: GroupProtocol> LocalGroup<P> {
    /// Create an empty group
    pub fn new(group_id: impl Into<String>, protocol_type: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            protocol_type: protocol_type.into(),
            members: BTreeMap::new(),
            join_order: Vec::new(),
            generation: 0,
            leader_id: None,
            rebalance_needed: false,
        }
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    /// Last generation handed out (0 before the first round)
    pub fn generation(&self) -> Epoch {
        self.generation
    }

    /// Round leader of the last round
    pub fn leader_id(&self) -> Option<&str> {
        self.leader_id.as_deref()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Member ids, oldest first
    pub fn member_ids(&self) -> &[String] {
        &self.join_order
    }

    pub fn member(&self, member_id: &str) -> Option<&P> {
        self.members.get(member_id)
    }

    pub fn member_mut(&mut self, member_id: &str) -> Option<&mut P> {
        self.members.get_mut(member_id)
    }

    /// Add a member; returns its generated member id
    pub fn join(&mut self, client_id: &str, member: P) -> Result<String> {
        if member.protocol_type() != self.protocol_type {
            return Err(Error::InconsistentProtocol {
                member_id: client_id.to_string(),
                expected: self.protocol_type.clone(),
                found: member.protocol_type().to_string(),
            });
        }

        let member_id = format!("{}-{}", client_id, Uuid::new_v4());
        tracing::info!("Member {} joined group {}", member_id, self.group_id);

        self.members.insert(member_id.clone(), member);
        self.join_order.push(member_id.clone());
        self.rebalance_needed = true;
        Ok(member_id)
    }

    /// Remove a member that left voluntarily
    pub fn leave(&mut self, member_id: &str) -> Result<P> {
        tracing::info!("Member {} leaving group {}", member_id, self.group_id);
        self.remove(member_id)
    }

    /// Remove a member whose session timed out
    pub fn expire(&mut self, member_id: &str) -> Result<P> {
        tracing::warn!("Member {} session expired in group {}", member_id, self.group_id);
        self.remove(member_id)
    }

    fn remove(&mut self, member_id: &str) -> Result<P> {
        let mut member = self
            .members
            .remove(member_id)
            .ok_or_else(|| Error::UnknownMember(member_id.to_string()))?;

        self.join_order.retain(|id| id != member_id);
        if self.leader_id.as_deref() == Some(member_id) {
            self.leader_id = None;
        }
        member.on_revoked();
        self.rebalance_needed = true;
        Ok(member)
    }

    /// Force a new round
    pub fn request_rejoin(&mut self) {
        self.rebalance_needed = true;
    }

    /// Check if a round is due
    pub fn needs_rebalance(&self) -> bool {
        self.rebalance_needed || self.members.values().any(|member| member.need_rejoin())
    }

    /// Run a round if one is due
    pub fn poll(&mut self) -> Result<Option<RoundSummary>> {
        if self.is_empty() || !self.needs_rebalance() {
            return Ok(None);
        }
        self.rebalance().map(Some)
    }

    /// Run one complete round
    pub fn rebalance(&mut self) -> Result<RoundSummary> {
        let leader_id = match &self.leader_id {
            Some(id) if self.members.contains_key(id) => id.clone(),
            _ => self.join_order.first().cloned().ok_or(Error::EmptyGroup)?,
        };
        self.rebalance_needed = false;

        // Every member revokes before rejoining
        for member in self.members.values_mut() {
            member.on_revoked();
        }

        let sub_protocol = match self.members.get(&leader_id) {
            Some(leader) => leader.sub_protocol_name().to_string(),
            None => return Err(Error::UnknownMember(leader_id)),
        };

        let mut metadata = BTreeMap::new();
        let mut excluded = Vec::new();
        for member_id in &self.join_order {
            let Some(member) = self.members.get_mut(member_id) else {
                continue;
            };

            if member.sub_protocol_name() != sub_protocol {
                tracing::warn!(
                    "Excluding {}: speaks {}, round uses {}",
                    member_id,
                    member.sub_protocol_name(),
                    sub_protocol
                );
                excluded.push(member_id.clone());
                continue;
            }

            match member.metadata() {
                Ok(bytes) => {
                    metadata.insert(member_id.clone(), bytes);
                }
                Err(e) => {
                    tracing::warn!("Excluding {}: no metadata: {}", member_id, e);
                    excluded.push(member_id.clone());
                }
            }
        }

        self.generation += 1;
        let generation = self.generation;
        self.leader_id = Some(leader_id.clone());

        tracing::debug!(
            "Group {} generation {}: round leader {} with {} members",
            self.group_id,
            generation,
            leader_id,
            metadata.len()
        );

        let computed = match self.members.get_mut(&leader_id) {
            Some(leader) => leader.compute_round_outcome(generation, &leader_id, &metadata),
            None => Err(Error::UnknownMember(leader_id.clone())),
        };
        let assignments = match computed {
            Ok(assignments) => assignments,
            Err(e) => {
                tracing::warn!("Generation {} aborted by round leader: {}", generation, e);
                self.rebalance_needed = true;
                return Err(e);
            }
        };

        if let Some(missing) = metadata.keys().find(|id| !assignments.contains_key(*id)) {
            self.rebalance_needed = true;
            return Err(Error::MissingAssignment(missing.clone()));
        }

        let mut failed = Vec::new();
        for member_id in metadata.keys() {
            let (Some(member), Some(assignment)) =
                (self.members.get_mut(member_id), assignments.get(member_id))
            else {
                continue;
            };

            if let Err(e) = member.on_round_complete(generation, member_id, assignment) {
                tracing::warn!("Member {} rejected generation {}: {}", member_id, generation, e);
                failed.push(member_id.clone());
            }
        }

        let members: Vec<String> = self
            .join_order
            .iter()
            .filter(|id| metadata.contains_key(*id))
            .cloned()
            .collect();

        tracing::info!(
            "Group {} generation {} complete ({} members, leader {})",
            self.group_id,
            generation,
            members.len(),
            leader_id
        );

        Ok(RoundSummary {
            generation,
            leader_id,
            sub_protocol,
            members,
            excluded,
            failed,
        })
    }
}
