//! Group Membership
//!
//! The capability interface a group membership engine drives, plus an
//! in-process engine that runs rounds without a network.

mod local;

pub use local::{LocalGroup, RoundSummary};

use std::collections::BTreeMap;

use crate::election::Epoch;
use crate::error::Result;

/// Hooks a group membership engine invokes on each participating node
///
/// The engine calls these from its own loop, one at a time. Only the
/// round leader sees `compute_round_outcome`; every member sees
/// `on_round_complete`.
pub trait GroupProtocol {
    /// Protocol family shared by every member of the group
    fn protocol_type(&self) -> &str;

    /// Sub-protocol name and version this member speaks
    fn sub_protocol_name(&self) -> &str;

    /// Metadata submitted on each join attempt
    fn metadata(&mut self) -> Result<Vec<u8>>;

    /// Compute every member's assignment (round leader only)
    fn compute_round_outcome(
        &mut self,
        epoch: Epoch,
        leader_id: &str,
        members: &BTreeMap<String, Vec<u8>>,
    ) -> Result<BTreeMap<String, Vec<u8>>>;

    /// Deliver this member's assignment for `epoch`
    fn on_round_complete(&mut self, epoch: Epoch, member_id: &str, assignment: &[u8]) -> Result<()>;

    /// The current assignment is about to be invalidated
    fn on_revoked(&mut self);

    /// Whether this member wants a new round
    fn need_rejoin(&self) -> bool {
        false
    }
}

impl<P: GroupProtocol + ?Sized> GroupProtocol for Box<P> {
    fn protocol_type(&self) -> &str {
        (**self).protocol_type()
    }

    fn sub_protocol_name(&self) -> &str {
        (**self).sub_protocol_name()
    }

    fn metadata(&mut self) -> Result<Vec<u8>> {
        (**self).metadata()
    }

    fn compute_round_outcome(
        &mut self,
        epoch: Epoch,
        leader_id: &str,
        members: &BTreeMap<String, Vec<u8>>,
    ) -> Result<BTreeMap<String, Vec<u8>>> {
        (**self).compute_round_outcome(epoch, leader_id, members)
    }

    fn on_round_complete(&mut self, epoch: Epoch, member_id: &str, assignment: &[u8]) -> Result<()> {
        (**self).on_round_complete(epoch, member_id, assignment)
    }

    fn on_revoked(&mut self) {
        (**self).on_revoked()
    }

    fn need_rejoin(&self) -> bool {
        (**self).need_rejoin()
    }
}
