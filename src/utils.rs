use crate::error::PaxosError;

/// Strict majority of `acceptor_count`: `⌊n/2⌋ + 1`.
///
/// Any two quorums of the same acceptor set share at least one member.
pub fn quorum_size(acceptor_count: usize) -> usize {
    acceptor_count / 2 + 1
}

/// Returns true once `votes` reaches the majority of `acceptor_count`.
pub fn has_quorum(votes: usize, acceptor_count: usize) -> bool {
    acceptor_count > 0 && votes >= quorum_size(acceptor_count)
}

/// Validate that a loss rate is a probability.
pub fn validate_loss_rate(loss_rate: f64) -> Result<(), PaxosError> {
    if !(0.0..=1.0).contains(&loss_rate) {
        return Err(PaxosError::InvalidLossRate(loss_rate));
    }
    Ok(())
}
