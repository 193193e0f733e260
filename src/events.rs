use tokio::sync::broadcast;

use crate::types::{PaxosValue, ProposalId};

#[derive(Debug, Clone, PartialEq)]
pub enum PaxosEvent<V> {
    /// A learner saw a majority accept this value. Published once per transport.
    Resolved { proposal_id: ProposalId, value: V },
    /// The transport stopped; propose loops exit at their next wake-up.
    Shutdown,
}

#[derive(Clone)]
pub struct BroadcastEventBus<V>
where
    V: PaxosValue,
{
    sender: broadcast::Sender<PaxosEvent<V>>,
}

impl<V> BroadcastEventBus<V>
where
    V: PaxosValue,
{
    pub fn new(buffer: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PaxosEvent<V>> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: PaxosEvent<V>) {
        // no subscribers is fine
        let _ = self.sender.send(event);
    }
}

impl<V> Default for BroadcastEventBus<V>
where
    V: PaxosValue,
{
    fn default() -> Self {
        Self::new(16)
    }
}
