use crate::types::{ActorId, ProposalId};

/// Phase 1a: proposer asks every acceptor to promise `proposal_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prepare {
    pub from: ActorId,
    pub proposal_id: ProposalId,
}

/// Phase 1b: acceptor promises `proposal_id` and reports what it already accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct Promise<V> {
    pub from: ActorId,
    pub to: ActorId,
    pub proposal_id: ProposalId,
    /// [`ProposalId::NONE`] when the acceptor never accepted anything.
    pub accepted_id: ProposalId,
    pub accepted_value: Option<V>,
}

/// Phase 2a: proposer asks every acceptor to accept `value` under `proposal_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptRequest<V> {
    pub from: ActorId,
    pub proposal_id: ProposalId,
    pub value: V,
}

/// Phase 2b: acceptor tells every learner it voted for `proposal_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct Accepted<V> {
    pub from: ActorId,
    pub proposal_id: ProposalId,
    pub value: V,
}

/// Everything the transport can deliver to an actor.
#[derive(Debug, Clone, PartialEq)]
pub enum Message<V> {
    Prepare(Prepare),
    Promise(Promise<V>),
    AcceptRequest(AcceptRequest<V>),
    Accepted(Accepted<V>),
}

impl<V> Message<V> {
    /// Short phase label used in diagnostics.
    pub fn phase(&self) -> &'static str {
        match self {
            Message::Prepare(_) => "prepare",
            Message::Promise(_) => "promise",
            Message::AcceptRequest(_) => "accept_request",
            Message::Accepted(_) => "accepted",
        }
    }

    pub fn proposal_id(&self) -> ProposalId {
        match self {
            Message::Prepare(m) => m.proposal_id,
            Message::Promise(m) => m.proposal_id,
            Message::AcceptRequest(m) => m.proposal_id,
            Message::Accepted(m) => m.proposal_id,
        }
    }
}
