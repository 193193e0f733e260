//! Wiring for a whole consensus instance: named actors, one transport, running proposers.

use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::{
    config::TransportConfig,
    error::PaxosError,
    transport::Transport,
    types::{ActorId, PaxosValue, Resolution},
};

/// Which actors to create and what each proposer campaigns for.
#[derive(Debug, Clone)]
pub struct SimulationConfig<V> {
    pub transport: TransportConfig,
    /// Proposer names with their initial candidate value.
    pub proposers: Vec<(String, V)>,
    pub acceptors: Vec<String>,
    pub learners: Vec<String>,
}

impl<V: PaxosValue> SimulationConfig<V> {
    pub fn new(transport: TransportConfig) -> Self {
        Self {
            transport,
            proposers: Vec::new(),
            acceptors: Vec::new(),
            learners: Vec::new(),
        }
    }

    pub fn with_proposer(mut self, name: impl Into<String>, value: V) -> Self {
        self.proposers.push((name.into(), value));
        self
    }

    pub fn with_acceptor(mut self, name: impl Into<String>) -> Self {
        self.acceptors.push(name.into());
        self
    }

    pub fn with_learner(mut self, name: impl Into<String>) -> Self {
        self.learners.push(name.into());
        self
    }

    /// Add `count` acceptors named `acceptor1..=acceptorN` after the existing ones.
    pub fn with_acceptors(mut self, count: usize) -> Self {
        let start = self.acceptors.len();
        self.acceptors
            .extend((start + 1..=start + count).map(|i| format!("acceptor{i}")));
        self
    }

    /// Add `count` learners named `learner1..=learnerN` after the existing ones.
    pub fn with_learners(mut self, count: usize) -> Self {
        let start = self.learners.len();
        self.learners
            .extend((start + 1..=start + count).map(|i| format!("learner{i}")));
        self
    }
}

/// A running consensus instance.
pub struct Simulation<V: PaxosValue> {
    transport: Transport<V>,
    proposer_ids: Vec<ActorId>,
    handles: Vec<JoinHandle<()>>,
}

impl<V: PaxosValue> Simulation<V> {
    /// Register every actor, then start each proposer's loop as its own task.
    ///
    /// Configuration errors (including an empty acceptor set) are reported before any
    /// proposer starts.
    pub fn start(config: SimulationConfig<V>) -> Result<Self, PaxosError> {
        let mut builder = Transport::builder(config.transport);
        let mut candidates = Vec::with_capacity(config.proposers.len());
        for (name, value) in config.proposers {
            candidates.push((builder.register_proposer(name), value));
        }
        for name in config.acceptors {
            builder.register_acceptor(name);
        }
        for name in config.learners {
            builder.register_learner(name);
        }
        let transport = builder.build()?;

        let mut proposer_ids = Vec::with_capacity(candidates.len());
        let mut handles = Vec::with_capacity(candidates.len());
        for (id, value) in candidates {
            handles.push(transport.spawn_propose_loop(id, value)?);
            proposer_ids.push(id);
        }

        Ok(Self {
            transport,
            proposer_ids,
            handles,
        })
    }

    pub fn transport(&self) -> &Transport<V> {
        &self.transport
    }

    pub fn proposer_ids(&self) -> &[ActorId] {
        &self.proposer_ids
    }

    pub async fn wait_for_resolution(&self) -> Resolution<V> {
        self.transport.wait_for_resolution().await
    }

    /// Stop the transport and wait for every propose loop to return.
    pub async fn shutdown(self) {
        self.transport.shutdown();
        for result in join_all(self.handles).await {
            if let Err(err) = result {
                warn!("Propose loop task failed: {err}");
            }
        }
    }
}
