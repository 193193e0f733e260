use std::time::Duration;

use crate::types::ActorId;

#[derive(Debug, thiserror::Error)]
pub enum PaxosError {
    #[error("No acceptors registered: quorum can never be reached")]
    NoAcceptors,
    #[error("Invalid loss rate {0}: must be within [0.0, 1.0]")]
    InvalidLossRate(f64),
    #[error("Invalid delivery delay range: min {min:?} is greater than max {max:?}")]
    InvalidDelayRange { min: Duration, max: Duration },
    #[error("Invalid retry interval: must be greater than zero")]
    InvalidRetryInterval,

    #[error("Unknown proposer id {0}")]
    UnknownProposer(ActorId),
}
