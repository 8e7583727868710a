//! WolfElect - Primary Election over Group Membership
//!
//! Elects at most one primary per epoch for a fleet of identical service
//! nodes. Election rides on an existing group membership protocol: the
//! engine picks a round leader and moves opaque bytes, WolfElect decides
//! what those bytes mean.
//!
//! # Architecture
//!
//! Each node owns one [`ElectionCoordinator`](election::ElectionCoordinator)
//! which implements the [`GroupProtocol`](membership::GroupProtocol) hooks.
//! Every node submits its [`Identity`](protocol::Identity) on join; the
//! round leader runs [`elect`](election::elect) over all submissions and
//! the resulting [`Outcome`](protocol::Outcome) is broadcast back to every
//! node's [`RebalanceListener`](election::RebalanceListener).
//!
//! # Features
//!
//! - Versioned, checksummed wire formats for identities and outcomes
//! - Deterministic election with a stability bias towards the round leader
//! - Duplicate address detection reported as a failed round
//! - In-process [`LocalGroup`](membership::LocalGroup) engine for tests
//!   and simulation

pub mod config;
pub mod error;
pub mod protocol;
pub mod election;
pub mod membership;

pub use config::ElectorConfig;
pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::ElectorConfig;
    pub use crate::error::{DecodeError, Error, Result};
    pub use crate::protocol::{Identity, Outcome, OutcomeStatus};
    pub use crate::election::{elect, ElectionCoordinator, Epoch, RebalanceListener};
    pub use crate::membership::{GroupProtocol, LocalGroup};
}
