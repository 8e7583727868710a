//! Election Coordinator
//!
//! Per-node session that plugs the election sub-protocol into a group
//! membership engine. It advertises this node's identity, runs the
//! election when the engine makes it round leader, and hands every
//! completed round to the node's [`RebalanceListener`].
//!
//! ```text
//! JOINING -> LEADING | FOLLOWING -> SYNCED -> ACTIVE -> REVOKING -> JOINING
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{elect, Epoch, RebalanceListener, RoundInput};
use crate::error::{Error, Result};
use crate::membership::GroupProtocol;
use crate::protocol::{Identity, Outcome, PROTOCOL_TYPE, SUBPROTOCOL_V0};

/// Coordinator state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoordinatorState {
    /// Waiting for the engine to form a round
    Joining,
    /// Round leader, computing the outcome
    Leading,
    /// Waiting for the round leader's outcome
    Following,
    /// Outcome received for this round
    Synced,
    /// Listener notified; holding until the next rebalance
    Active,
    /// Notifying the listener that the assignment is gone
    Revoking,
}

impl std::fmt::Display for CoordinatorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoordinatorState::Joining => write!(f, "JOINING"),
            CoordinatorState::Leading => write!(f, "LEADING"),
            CoordinatorState::Following => write!(f, "FOLLOWING"),
            CoordinatorState::Synced => write!(f, "SYNCED"),
            CoordinatorState::Active => write!(f, "ACTIVE"),
            CoordinatorState::Revoking => write!(f, "REVOKING"),
        }
    }
}

/// Point-in-time view of a coordinator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorStatus {
    pub state: CoordinatorState,
    pub member_id: Option<String>,
    pub identity: Identity,
    pub epoch: Option<Epoch>,
    pub is_primary: bool,
    pub outcome: Option<Outcome>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub need_rejoin: bool,
}

/// Election coordinator for one node
pub struct ElectionCoordinator<L: RebalanceListener> {
    /// Identity advertised on every join
    identity: Identity,
    /// Service callbacks
    listener: L,
    /// Current state
    state: CoordinatorState,
    /// Member id from the most recent round
    member_id: Option<String>,
    /// Epoch of the last assignment
    epoch: Option<Epoch>,
    /// Outcome of the last assignment (cleared on revoke)
    last_outcome: Option<Outcome>,
    /// When the last assignment was delivered
    assigned_at: Option<DateTime<Utc>>,
    /// Set when this node needs a new round
    rejoin_needed: bool,
}

impl<L: RebalanceListener> ElectionCoordinator<L> {
    /// Create a new coordinator in the JOINING state
    pub fn new(identity: Identity, listener: L) -> Self {
        Self {
            identity,
            listener,
            state: CoordinatorState::Joining,
            member_id: None,
            epoch: None,
            last_outcome: None,
            assigned_at: None,
            rejoin_needed: false,
        }
    }

    /// Get current state
    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    /// Get the advertised identity
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Member id assigned by the engine, once a round has been seen
    pub fn member_id(&self) -> Option<&str> {
        self.member_id.as_deref()
    }

    /// Epoch of the last assignment
    pub fn epoch(&self) -> Option<Epoch> {
        self.epoch
    }

    /// Outcome currently in force, if any
    pub fn last_outcome(&self) -> Option<&Outcome> {
        self.last_outcome.as_ref()
    }

    /// Check if this node is the primary for the current epoch
    pub fn is_primary(&self) -> bool {
        match (&self.last_outcome, &self.member_id) {
            (Some(outcome), Some(member_id)) => {
                self.state == CoordinatorState::Active && outcome.is_primary(member_id)
            }
            _ => false,
        }
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }

    pub fn listener_mut(&mut self) -> &mut L {
        &mut self.listener
    }

    /// Ask the engine for a new round
    ///
    /// A round in progress is dropped without notifying the listener. An
    /// active assignment stays in force until the engine revokes it.
    pub fn request_rejoin(&mut self) {
        self.rejoin_needed = true;
        match self.state {
            CoordinatorState::Leading | CoordinatorState::Following | CoordinatorState::Synced => {
                tracing::debug!("Rejoin requested mid-round, discarding round state");
                self.transition(CoordinatorState::Joining);
            }
            _ => {}
        }
    }

    /// Snapshot for status reporting
    pub fn status(&self) -> CoordinatorStatus {
        CoordinatorStatus {
            state: self.state,
            member_id: self.member_id.clone(),
            identity: self.identity.clone(),
            epoch: self.epoch,
            is_primary: self.is_primary(),
            outcome: self.last_outcome.clone(),
            assigned_at: self.assigned_at,
            need_rejoin: self.rejoin_needed,
        }
    }

    fn transition(&mut self, next: CoordinatorState) {
        if self.state != next {
            tracing::debug!("Coordinator {} -> {}", self.state, next);
            self.state = next;
        }
    }

    /// Leave ACTIVE (notifying the listener once) or drop a partial round
    fn revoke(&mut self) {
        match self.state {
            CoordinatorState::Joining => {}
            CoordinatorState::Active => {
                self.transition(CoordinatorState::Revoking);
                self.last_outcome = None;
                self.listener.on_revoked();
                tracing::info!(
                    "Revoked assignment for epoch {}",
                    self.epoch.unwrap_or_default()
                );
                self.transition(CoordinatorState::Joining);
            }
            state => {
                tracing::debug!("Dropping partial round in state {}", state);
                self.transition(CoordinatorState::Joining);
            }
        }
    }

    /// Give up on the current round and ask for another
    fn abort_round(&mut self) {
        self.rejoin_needed = true;
        self.member_id = None;
        self.transition(CoordinatorState::Joining);
    }
}

impl<L: RebalanceListener> GroupProtocol for ElectionCoordinator<L> {
    fn protocol_type(&self) -> &str {
        PROTOCOL_TYPE
    }

    fn sub_protocol_name(&self) -> &str {
        SUBPROTOCOL_V0
    }

    fn metadata(&mut self) -> Result<Vec<u8>> {
        if self.state == CoordinatorState::Active {
            tracing::warn!("Join started without revocation, revoking epoch {:?}", self.epoch);
        }
        self.revoke();
        self.identity.encode().map_err(|e| {
            tracing::warn!("Cannot encode identity {}: {}", self.identity, e);
            self.rejoin_needed = true;
            e
        })
    }

    fn compute_round_outcome(
        &mut self,
        epoch: Epoch,
        leader_id: &str,
        members: &BTreeMap<String, Vec<u8>>,
    ) -> Result<BTreeMap<String, Vec<u8>>> {
        self.revoke();
        self.transition(CoordinatorState::Leading);

        let mut round = RoundInput::new();
        for (member_id, metadata) in members {
            match Identity::decode(metadata) {
                Ok(identity) => {
                    round.insert(member_id.clone(), identity);
                }
                Err(e) => {
                    tracing::warn!(
                        "Excluding member {} from epoch {}: {}",
                        member_id,
                        epoch,
                        e
                    );
                }
            }
        }

        let outcome = elect(&round, leader_id);
        tracing::info!(
            "Epoch {}: computed outcome over {} of {} members: {}",
            epoch,
            round.len(),
            members.len(),
            outcome
        );

        let bytes = match outcome.encode() {
            Ok(bytes) => bytes,
            Err(e) => {
                self.abort_round();
                return Err(e);
            }
        };
        self.member_id = Some(leader_id.to_string());

        Ok(members
            .keys()
            .map(|member_id| (member_id.clone(), bytes.clone()))
            .collect())
    }

    fn on_round_complete(&mut self, epoch: Epoch, member_id: &str, assignment: &[u8]) -> Result<()> {
        if self.state == CoordinatorState::Active {
            tracing::warn!("Epoch {} delivered without revocation", epoch);
            self.revoke();
        }
        if self.state == CoordinatorState::Joining {
            self.transition(CoordinatorState::Following);
        }

        if let Some(last) = self.epoch {
            if epoch <= last {
                tracing::warn!("Ignoring stale epoch {} (last assigned {})", epoch, last);
                self.abort_round();
                return Err(Error::StaleEpoch { epoch, last });
            }
        }

        let outcome = match Outcome::decode(assignment) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!("Undecodable assignment for epoch {}: {}", epoch, e);
                self.abort_round();
                return Err(e.into());
            }
        };

        self.member_id = Some(member_id.to_string());
        self.transition(CoordinatorState::Synced);

        if outcome.failed() {
            tracing::warn!("Epoch {} election failed: {}", epoch, outcome);
        } else {
            tracing::info!("Epoch {} assigned to {}: {}", epoch, member_id, outcome);
        }

        self.epoch = Some(epoch);
        self.assigned_at = Some(Utc::now());
        self.rejoin_needed = false;
        self.listener.on_assigned(&outcome, epoch);
        self.last_outcome = Some(outcome);
        self.transition(CoordinatorState::Active);

        Ok(())
    }

    fn on_revoked(&mut self) {
        self.revoke();
    }

    fn need_rejoin(&self) -> bool {
        self.rejoin_needed
    }
}
