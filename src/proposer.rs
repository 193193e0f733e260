//! Proposer role: drives phase 1 (prepare/promise) and phase 2 (accept) for one value.
//!
//! Handlers never talk to the transport themselves. They return the outbound message, so
//! the proposer's lock is always released before anything is sent.

use std::collections::HashSet;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::{
    messages::{AcceptRequest, Prepare, Promise},
    types::{ActorId, PaxosValue, ProposalId},
    utils::has_quorum,
};

#[derive(Debug, Clone)]
struct ProposerState<V> {
    proposed_value: Option<V>,
    proposal_id: ProposalId,
    /// Highest previously-accepted id reported by any promise.
    highest_accepted_id: ProposalId,
    next_proposal_number: u32,
    /// Acceptors that promised the current `proposal_id`.
    promises: HashSet<ActorId>,
    /// Set by every counted promise, cleared by the propose loop each interval.
    promised_recently: bool,
    /// Accept request already issued for the current round.
    accept_sent: bool,
}

#[derive(Debug)]
pub struct Proposer<V: PaxosValue> {
    id: ActorId,
    name: String,
    state: Mutex<ProposerState<V>>,
}

impl<V: PaxosValue> Proposer<V> {
    pub fn new(id: ActorId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            state: Mutex::new(ProposerState {
                proposed_value: None,
                proposal_id: ProposalId::NONE,
                highest_accepted_id: ProposalId::NONE,
                next_proposal_number: 1,
                promises: HashSet::new(),
                promised_recently: false,
                accept_sent: false,
            }),
        }
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn proposed_value(&self) -> Option<V> {
        self.state.lock().proposed_value.clone()
    }

    pub fn current_proposal_id(&self) -> ProposalId {
        self.state.lock().proposal_id
    }

    pub fn promise_count(&self) -> usize {
        self.state.lock().promises.len()
    }

    /// Set the value to campaign for. Only the first call has any effect.
    ///
    /// A value learned from an acceptor through [`Proposer::on_promise`] still takes over later.
    pub fn set_proposal(&self, value: V) {
        let mut state = self.state.lock();
        if state.proposed_value.is_none() {
            state.proposed_value = Some(value);
        }
    }

    /// Start a new round with a strictly higher proposal number.
    ///
    /// Returns the prepare message to broadcast to every acceptor.
    pub fn prepare(&self) -> Prepare {
        let proposal_id = {
            let mut state = self.state.lock();
            state.promises = HashSet::new();
            state.accept_sent = false;
            state.proposal_id = ProposalId::new(state.next_proposal_number, self.id);
            state.next_proposal_number += 1;
            state.proposal_id
        };

        info!(
            "[ {} ] send_prepare for proposal_id = {proposal_id}",
            self.name
        );
        Prepare {
            from: self.id,
            proposal_id,
        }
    }

    /// True when a promise was counted since the last [`Proposer::clear_promised_recently`].
    pub fn promised_recently(&self) -> bool {
        self.state.lock().promised_recently
    }

    pub fn clear_promised_recently(&self) {
        self.state.lock().promised_recently = false;
    }

    /// Handle a promise from an acceptor.
    ///
    /// Promises for another round and repeated promises from the same acceptor are dropped.
    /// If the acceptor already accepted a value under a higher id than any seen so far, that
    /// value replaces ours. Once `acceptor_count`'s majority has promised, the accept request
    /// is returned, exactly once per round.
    pub fn on_promise(
        &self,
        promise: Promise<V>,
        acceptor_count: usize,
    ) -> Option<AcceptRequest<V>> {
        debug!(
            "[ {} ] recv_promise from {} with proposal_id = {}, accepted_id = {}, accepted_value = {:?}",
            self.name, promise.from, promise.proposal_id, promise.accepted_id, promise.accepted_value
        );
        let request = {
            let mut state = self.state.lock();
            if promise.proposal_id != state.proposal_id {
                return None;
            }
            if !state.promises.insert(promise.from) {
                return None;
            }
            state.promised_recently = true;

            if promise.accepted_id > state.highest_accepted_id {
                state.highest_accepted_id = promise.accepted_id;
                if let Some(value) = promise.accepted_value {
                    state.proposed_value = Some(value);
                }
            }

            if state.accept_sent || !has_quorum(state.promises.len(), acceptor_count) {
                return None;
            }
            let value = state.proposed_value.clone()?;
            state.accept_sent = true;
            AcceptRequest {
                from: self.id,
                proposal_id: state.proposal_id,
                value,
            }
        };

        info!(
            "[ {} ] send_accept with proposal_id = {}, value = {:?}",
            self.name, request.proposal_id, request.value
        );
        Some(request)
    }
}
