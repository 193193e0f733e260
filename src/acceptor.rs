//! Acceptor role: the passive voter holding the safety-critical promise/accept state.

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::{
    messages::{Accepted, Promise},
    types::{ActorId, PaxosValue, ProposalId},
};

#[derive(Debug, Clone)]
struct AcceptorState<V> {
    /// Highest id this acceptor promised to honor.
    promised_id: ProposalId,
    /// Id and value of the last proposal voted for; written together.
    accepted_id: ProposalId,
    accepted_value: Option<V>,
}

#[derive(Debug)]
pub struct Acceptor<V: PaxosValue> {
    id: ActorId,
    name: String,
    state: Mutex<AcceptorState<V>>,
}

impl<V: PaxosValue> Acceptor<V> {
    pub fn new(id: ActorId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            state: Mutex::new(AcceptorState {
                promised_id: ProposalId::NONE,
                accepted_id: ProposalId::NONE,
                accepted_value: None,
            }),
        }
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn promised_id(&self) -> ProposalId {
        self.state.lock().promised_id
    }

    /// Last accepted id and value, if this acceptor ever voted.
    pub fn accepted(&self) -> Option<(ProposalId, V)> {
        let state = self.state.lock();
        state
            .accepted_value
            .clone()
            .map(|value| (state.accepted_id, value))
    }

    /// Handle a prepare request.
    ///
    /// A duplicate prepare for the currently promised id is answered again so a retrying
    /// proposer does not stall. Lower ids are ignored; the promise never regresses.
    pub fn on_prepare(&self, from: ActorId, proposal_id: ProposalId) -> Option<Promise<V>> {
        debug!(
            "[ {} ] recv_prepare from {from} with proposal_id = {proposal_id}",
            self.name
        );
        let promise = {
            let mut state = self.state.lock();
            if proposal_id < state.promised_id || proposal_id.is_none() {
                return None;
            }
            state.promised_id = proposal_id;
            Promise {
                from: self.id,
                to: from,
                proposal_id,
                accepted_id: state.accepted_id,
                accepted_value: state.accepted_value.clone(),
            }
        };

        info!(
            "[ {} ] send_promise to {from} with proposal_id = {proposal_id}, accepted_id = {}, accepted_value = {:?}",
            self.name, promise.accepted_id, promise.accepted_value
        );
        Some(promise)
    }

    /// Handle an accept request.
    ///
    /// Accepted when `proposal_id >= promised_id`: the issuing proposer already holds this
    /// acceptor's promise for an equal id. The returned [`Accepted`] goes to every learner.
    pub fn on_accept_request(
        &self,
        from: ActorId,
        proposal_id: ProposalId,
        value: V,
    ) -> Option<Accepted<V>> {
        debug!(
            "[ {} ] recv_accept_request from {from} with proposal_id = {proposal_id}, value = {value:?}",
            self.name
        );
        {
            let mut state = self.state.lock();
            if proposal_id < state.promised_id || proposal_id.is_none() {
                return None;
            }
            state.promised_id = proposal_id;
            state.accepted_id = proposal_id;
            state.accepted_value = Some(value.clone());
        }

        info!(
            "[ {} ] send_accepted with proposal_id = {proposal_id}, value = {value:?}",
            self.name
        );
        Some(Accepted {
            from: self.id,
            proposal_id,
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROPOSER: ActorId = 1;
    const OTHER_PROPOSER: ActorId = 2;

    fn acceptor() -> Acceptor<u64> {
        Acceptor::new(10, "acceptor")
    }

    #[test]
    fn promises_higher_id_and_reports_nothing_accepted() {
        let acceptor = acceptor();
        let id = ProposalId::new(1, PROPOSER);

        let promise = acceptor.on_prepare(PROPOSER, id).expect("promise");
        assert_eq!(promise.from, 10);
        assert_eq!(promise.to, PROPOSER);
        assert_eq!(promise.proposal_id, id);
        assert!(promise.accepted_id.is_none());
        assert_eq!(promise.accepted_value, None);
        assert_eq!(acceptor.promised_id(), id);
    }

    #[test]
    fn duplicate_prepare_is_answered_again() {
        let acceptor = acceptor();
        let id = ProposalId::new(3, PROPOSER);

        let first = acceptor.on_prepare(PROPOSER, id).expect("first promise");
        let second = acceptor.on_prepare(PROPOSER, id).expect("second promise");
        assert_eq!(first, second);
    }

    #[test]
    fn lower_prepare_is_ignored() {
        let acceptor = acceptor();
        let high = ProposalId::new(2, OTHER_PROPOSER);
        acceptor.on_prepare(OTHER_PROPOSER, high).expect("promise");

        assert!(acceptor.on_prepare(PROPOSER, ProposalId::new(2, PROPOSER)).is_none());
        assert!(acceptor.on_prepare(PROPOSER, ProposalId::new(1, 9)).is_none());
        assert_eq!(acceptor.promised_id(), high);
    }

    #[test]
    fn accept_with_equal_id_is_taken() {
        let acceptor = acceptor();
        let id = ProposalId::new(1, PROPOSER);
        acceptor.on_prepare(PROPOSER, id).expect("promise");

        let accepted = acceptor
            .on_accept_request(PROPOSER, id, 42)
            .expect("accepted");
        assert_eq!(accepted.from, 10);
        assert_eq!(accepted.proposal_id, id);
        assert_eq!(accepted.value, 42);
        assert_eq!(acceptor.accepted(), Some((id, 42)));
    }

    #[test]
    fn accept_below_promise_leaves_state_untouched() {
        let acceptor = acceptor();
        let low = ProposalId::new(1, PROPOSER);
        let high = ProposalId::new(1, OTHER_PROPOSER);
        acceptor.on_prepare(PROPOSER, low).expect("promise");
        acceptor.on_prepare(OTHER_PROPOSER, high).expect("promise");

        assert!(acceptor.on_accept_request(PROPOSER, low, 10).is_none());
        assert_eq!(acceptor.accepted(), None);
        assert_eq!(acceptor.promised_id(), high);
    }

    #[test]
    fn accept_without_prior_prepare_raises_promise() {
        let acceptor = acceptor();
        let id = ProposalId::new(4, PROPOSER);

        acceptor.on_accept_request(PROPOSER, id, 7).expect("accepted");
        assert_eq!(acceptor.promised_id(), id);
        assert!(
            acceptor
                .on_prepare(OTHER_PROPOSER, ProposalId::new(3, OTHER_PROPOSER))
                .is_none()
        );
    }

    #[test]
    fn later_promise_carries_previous_acceptance() {
        let acceptor = acceptor();
        let first = ProposalId::new(1, PROPOSER);
        acceptor.on_accept_request(PROPOSER, first, 10).expect("accepted");

        let promise = acceptor
            .on_prepare(OTHER_PROPOSER, ProposalId::new(2, OTHER_PROPOSER))
            .expect("promise");
        assert_eq!(promise.accepted_id, first);
        assert_eq!(promise.accepted_value, Some(10));
    }

    #[test]
    fn promised_id_never_decreases() {
        let acceptor = acceptor();
        let ids = [
            ProposalId::new(2, 1),
            ProposalId::new(1, 5),
            ProposalId::new(3, 1),
            ProposalId::new(3, 0),
            ProposalId::new(2, 9),
            ProposalId::new(5, 2),
        ];

        let mut last = acceptor.promised_id();
        for (i, id) in ids.into_iter().enumerate() {
            if i % 2 == 0 {
                acceptor.on_prepare(id.owner(), id);
            } else {
                acceptor.on_accept_request(id.owner(), id, i as u64);
            }
            let promised = acceptor.promised_id();
            assert!(promised >= last, "promise regressed from {last:?} to {promised:?}");
            last = promised;
        }
        assert_eq!(last, ProposalId::new(5, 2));
    }
}
