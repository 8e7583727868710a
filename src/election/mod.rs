//! Primary Election
//!
//! The assignment algorithm run by the round leader, the per-node
//! coordinator that plugs it into the group membership engine, and the
//! listener contract the hosting service implements.

mod assignor;
mod coordinator;
mod listener;

pub use assignor::{elect, RoundInput};
pub use coordinator::{CoordinatorState, CoordinatorStatus, ElectionCoordinator};
pub use listener::{LoggingListener, RebalanceListener};

/// Round counter assigned by the membership engine
pub type Epoch = u64;
