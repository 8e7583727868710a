//! Rebalance notifications delivered to the hosting service.

use crate::protocol::Outcome;

use super::Epoch;

/// Receives election results for one node
///
/// Calls arrive from the membership engine's loop, one at a time.
/// `on_revoked` always precedes the next `on_assigned`.
pub trait RebalanceListener {
    /// A round completed with `outcome` for `epoch`
    fn on_assigned(&mut self, outcome: &Outcome, epoch: Epoch);

    /// The last assignment is no longer valid; a new round is starting
    fn on_revoked(&mut self);
}

/// Listener that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingListener;

impl RebalanceListener for LoggingListener {
    fn on_assigned(&mut self, outcome: &Outcome, epoch: Epoch) {
        tracing::info!("Epoch {}: {}", epoch, outcome);
    }

    fn on_revoked(&mut self) {
        tracing::info!("Assignment revoked");
    }
}
