//! Learner role: tallies `Accepted` votes and detects the majority decision.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::{
    messages::Accepted,
    types::{ActorId, PaxosValue, ProposalId, Resolution},
    utils::has_quorum,
};

/// Votes gathered for one proposal id.
#[derive(Debug, Clone)]
struct Tally<V> {
    accept_count: usize,
    /// Acceptors whose latest vote is still this proposal.
    live_voters: usize,
    value: V,
}

#[derive(Debug)]
struct LearnerState<V> {
    proposals: HashMap<ProposalId, Tally<V>>,
    /// Latest proposal id each acceptor voted for.
    voted: HashMap<ActorId, ProposalId>,
    decision: Option<Resolution<V>>,
}

#[derive(Debug)]
pub struct Learner<V: PaxosValue> {
    id: ActorId,
    name: String,
    state: Mutex<LearnerState<V>>,
}

impl<V: PaxosValue> Learner<V> {
    pub fn new(id: ActorId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            state: Mutex::new(LearnerState {
                proposals: HashMap::new(),
                voted: HashMap::new(),
                decision: None,
            }),
        }
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_complete(&self) -> bool {
        self.state.lock().decision.is_some()
    }

    pub fn final_value(&self) -> Option<V> {
        self.state
            .lock()
            .decision
            .as_ref()
            .map(|decision| decision.value.clone())
    }

    pub fn final_proposal_id(&self) -> Option<ProposalId> {
        self.state
            .lock()
            .decision
            .as_ref()
            .map(|decision| decision.proposal_id)
    }

    /// Number of proposal ids that still have at least one live vote.
    pub fn tracked_proposals(&self) -> usize {
        self.state.lock().proposals.len()
    }

    /// Handle an acceptor's vote.
    ///
    /// An acceptor's vote only ever moves to a strictly higher id; the previous vote is
    /// retracted and its tally dropped once nobody backs it. Returns the resolution the first
    /// time a proposal is accepted by a majority of `acceptor_count`; afterwards the learner
    /// ignores everything.
    pub fn on_accepted(
        &self,
        accepted: Accepted<V>,
        acceptor_count: usize,
    ) -> Option<Resolution<V>> {
        let Accepted {
            from,
            proposal_id,
            value,
        } = accepted;
        debug!(
            "[ {} ] recv_accepted from {from} with proposal_id = {proposal_id}, accepted_value = {value:?}",
            self.name
        );

        let (resolution, votes) = {
            let mut state = self.state.lock();
            if state.decision.is_some() {
                return None;
            }

            let previous = state.voted.get(&from).copied().unwrap_or(ProposalId::NONE);
            if proposal_id <= previous {
                return None;
            }
            state.voted.insert(from, proposal_id);

            if let Some(tally) = state.proposals.get_mut(&previous) {
                tally.live_voters -= 1;
                if tally.live_voters == 0 {
                    state.proposals.remove(&previous);
                }
            }

            let tally = state.proposals.entry(proposal_id).or_insert_with(|| Tally {
                accept_count: 0,
                live_voters: 0,
                value,
            });
            tally.accept_count += 1;
            tally.live_voters += 1;
            let votes = tally.accept_count;

            if !has_quorum(votes, acceptor_count) {
                return None;
            }
            let resolution = Resolution {
                proposal_id,
                value: tally.value.clone(),
            };
            state.decision = Some(resolution.clone());
            state.proposals = HashMap::new();
            state.voted = HashMap::new();
            (resolution, votes)
        };

        info!(
            "[ {} ] learned value = {:?} with proposal_id = {} from {votes} of {acceptor_count} acceptors",
            self.name, resolution.value, resolution.proposal_id
        );
        Some(resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCEPTORS: usize = 3;

    fn accepted(from: ActorId, proposal_id: ProposalId, value: u64) -> Accepted<u64> {
        Accepted {
            from,
            proposal_id,
            value,
        }
    }

    #[test]
    fn decides_at_majority() {
        let learner = Learner::new(9, "learner");
        let id = ProposalId::new(1, 1);

        assert!(learner.on_accepted(accepted(2, id, 10), ACCEPTORS).is_none());
        assert!(!learner.is_complete());

        let resolution = learner
            .on_accepted(accepted(3, id, 10), ACCEPTORS)
            .expect("decided");
        assert_eq!(resolution.proposal_id, id);
        assert_eq!(resolution.value, 10);
        assert!(learner.is_complete());
        assert_eq!(learner.final_value(), Some(10));
        assert_eq!(learner.final_proposal_id(), Some(id));
        assert_eq!(learner.tracked_proposals(), 0);
    }

    #[test]
    fn repeated_vote_is_not_double_counted() {
        let learner = Learner::new(9, "learner");
        let id = ProposalId::new(1, 1);

        assert!(learner.on_accepted(accepted(2, id, 10), ACCEPTORS).is_none());
        assert!(learner.on_accepted(accepted(2, id, 10), ACCEPTORS).is_none());
        assert!(!learner.is_complete());
    }

    #[test]
    fn regressing_vote_is_ignored() {
        let learner = Learner::new(9, "learner");
        learner.on_accepted(accepted(2, ProposalId::new(2, 1), 10), ACCEPTORS);
        learner.on_accepted(accepted(2, ProposalId::new(1, 1), 10), ACCEPTORS);
        assert_eq!(learner.tracked_proposals(), 1);

        assert!(
            learner
                .on_accepted(accepted(3, ProposalId::new(1, 1), 10), ACCEPTORS)
                .is_none()
        );
        assert_eq!(learner.tracked_proposals(), 2);
    }

    #[test]
    fn superseded_vote_is_retracted() {
        let learner = Learner::new(9, "learner");
        let old = ProposalId::new(1, 1);
        let new = ProposalId::new(1, 5);

        learner.on_accepted(accepted(2, old, 10), ACCEPTORS);
        assert_eq!(learner.tracked_proposals(), 1);

        // acceptor 2 moves its vote; nobody backs `old` anymore
        learner.on_accepted(accepted(2, new, 20), ACCEPTORS);
        assert_eq!(learner.tracked_proposals(), 1);

        let resolution = learner
            .on_accepted(accepted(3, new, 20), ACCEPTORS)
            .expect("decided");
        assert_eq!(resolution.value, 20);
    }

    #[test]
    fn retracted_vote_still_counts_toward_its_proposal() {
        let learner = Learner::new(9, "learner");
        let old = ProposalId::new(1, 1);
        let new = ProposalId::new(2, 1);

        learner.on_accepted(accepted(2, old, 10), 5);
        learner.on_accepted(accepted(3, old, 10), 5);
        learner.on_accepted(accepted(2, new, 10), 5);
        assert_eq!(learner.tracked_proposals(), 2);

        let resolution = learner
            .on_accepted(accepted(4, old, 10), 5)
            .expect("three accepts reached for old id");
        assert_eq!(resolution.proposal_id, old);
    }

    #[test]
    fn inert_after_decision() {
        let learner = Learner::new(9, "learner");
        let id = ProposalId::new(1, 1);
        learner.on_accepted(accepted(2, id, 10), 1).expect("decided");

        assert!(
            learner
                .on_accepted(accepted(3, ProposalId::new(5, 2), 20), 1)
                .is_none()
        );
        assert_eq!(learner.final_value(), Some(10));
        assert_eq!(learner.tracked_proposals(), 0);
    }
}
