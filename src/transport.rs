//! The message bus connecting every actor of one consensus instance.
//!
//! Actors are registered through [`TransportBuilder`] and referenced by [`ActorId`] only;
//! the transport owns them. Each delivery runs as its own tokio task, optionally delayed,
//! and may be dropped according to the configured loss rate.

use std::{
    collections::HashMap,
    fmt,
    sync::{
        Arc, OnceLock,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::{sync::Notify, task::JoinHandle, time::sleep};
use tracing::{info, trace, warn};

use crate::{
    acceptor::Acceptor,
    config::TransportConfig,
    error::PaxosError,
    events::{BroadcastEventBus, PaxosEvent},
    learner::Learner,
    messages::{AcceptRequest, Accepted, Message, Prepare, Promise},
    proposer::Proposer,
    stats::{StatsCounters, TransportStats},
    types::{ActorId, PaxosValue, Resolution},
    utils::quorum_size,
};

/// Embedder hook invoked with the first resolution reached on a transport.
pub type ResolutionCallback<V> = Arc<dyn Fn(&Resolution<V>) + Send + Sync>;

enum Registered<V: PaxosValue> {
    Proposer(Arc<Proposer<V>>),
    Acceptor(Arc<Acceptor<V>>),
    Learner(Arc<Learner<V>>),
}

impl<V: PaxosValue> Registered<V> {
    fn name(&self) -> &str {
        match self {
            Registered::Proposer(proposer) => proposer.name(),
            Registered::Acceptor(acceptor) => acceptor.name(),
            Registered::Learner(learner) => learner.name(),
        }
    }
}

/// Registers actors and seals them into a [`Transport`].
pub struct TransportBuilder<V: PaxosValue> {
    config: TransportConfig,
    next_id: ActorId,
    actors: HashMap<ActorId, Registered<V>>,
    proposers: Vec<ActorId>,
    acceptors: Vec<ActorId>,
    learners: Vec<ActorId>,
    on_resolution: Option<ResolutionCallback<V>>,
}

impl<V: PaxosValue> TransportBuilder<V> {
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            next_id: 0,
            actors: HashMap::new(),
            proposers: Vec::new(),
            acceptors: Vec::new(),
            learners: Vec::new(),
            on_resolution: None,
        }
    }

    fn allocate_id(&mut self) -> ActorId {
        self.next_id += 1;
        self.next_id
    }

    pub fn register_proposer(&mut self, name: impl Into<String>) -> ActorId {
        let id = self.allocate_id();
        self.actors
            .insert(id, Registered::Proposer(Arc::new(Proposer::new(id, name))));
        self.proposers.push(id);
        id
    }

    pub fn register_acceptor(&mut self, name: impl Into<String>) -> ActorId {
        let id = self.allocate_id();
        self.actors
            .insert(id, Registered::Acceptor(Arc::new(Acceptor::new(id, name))));
        self.acceptors.push(id);
        id
    }

    pub fn register_learner(&mut self, name: impl Into<String>) -> ActorId {
        let id = self.allocate_id();
        self.actors
            .insert(id, Registered::Learner(Arc::new(Learner::new(id, name))));
        self.learners.push(id);
        id
    }

    /// Install the callback run once, on the first resolution.
    pub fn with_resolution_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Resolution<V>) + Send + Sync + 'static,
    {
        self.on_resolution = Some(Arc::new(handler));
        self
    }

    /// Validate the configuration and freeze the registry.
    pub fn build(self) -> Result<Transport<V>, PaxosError> {
        self.config.validate()?;
        if self.acceptors.is_empty() {
            return Err(PaxosError::NoAcceptors);
        }

        let rng = match self.config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        Ok(Transport {
            inner: Arc::new(TransportInner {
                config: self.config,
                actors: self.actors,
                proposers: self.proposers,
                acceptors: self.acceptors,
                learners: self.learners,
                rng: Mutex::new(rng),
                stats: StatsCounters::default(),
                resolution: OnceLock::new(),
                resolved: Notify::new(),
                shutdown: AtomicBool::new(false),
                events: BroadcastEventBus::default(),
                on_resolution: self.on_resolution,
            }),
        })
    }
}

struct TransportInner<V: PaxosValue> {
    config: TransportConfig,
    /// Immutable after build, so reads need no lock.
    actors: HashMap<ActorId, Registered<V>>,
    proposers: Vec<ActorId>,
    acceptors: Vec<ActorId>,
    learners: Vec<ActorId>,
    rng: Mutex<ChaCha8Rng>,
    stats: StatsCounters,
    resolution: OnceLock<Resolution<V>>,
    resolved: Notify,
    shutdown: AtomicBool,
    events: BroadcastEventBus<V>,
    on_resolution: Option<ResolutionCallback<V>>,
}

pub struct Transport<V: PaxosValue> {
    inner: Arc<TransportInner<V>>,
}

impl<V: PaxosValue> Clone for Transport<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V: PaxosValue> fmt::Debug for Transport<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("config", &self.inner.config)
            .field("proposers", &self.inner.proposers)
            .field("acceptors", &self.inner.acceptors)
            .field("learners", &self.inner.learners)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

impl<V: PaxosValue> Transport<V> {
    pub fn builder(config: TransportConfig) -> TransportBuilder<V> {
        TransportBuilder::new(config)
    }

    pub fn config(&self) -> &TransportConfig {
        &self.inner.config
    }

    pub fn acceptor_count(&self) -> usize {
        self.inner.acceptors.len()
    }

    pub fn quorum_size(&self) -> usize {
        quorum_size(self.acceptor_count())
    }

    pub fn name_of(&self, id: ActorId) -> Option<&str> {
        self.inner.actors.get(&id).map(Registered::name)
    }

    pub fn proposer(&self, id: ActorId) -> Option<Arc<Proposer<V>>> {
        match self.inner.actors.get(&id) {
            Some(Registered::Proposer(proposer)) => Some(Arc::clone(proposer)),
            _ => None,
        }
    }

    pub fn acceptor(&self, id: ActorId) -> Option<Arc<Acceptor<V>>> {
        match self.inner.actors.get(&id) {
            Some(Registered::Acceptor(acceptor)) => Some(Arc::clone(acceptor)),
            _ => None,
        }
    }

    pub fn learner(&self, id: ActorId) -> Option<Arc<Learner<V>>> {
        match self.inner.actors.get(&id) {
            Some(Registered::Learner(learner)) => Some(Arc::clone(learner)),
            _ => None,
        }
    }

    pub fn proposers(&self) -> Vec<Arc<Proposer<V>>> {
        self.inner
            .proposers
            .iter()
            .filter_map(|id| self.proposer(*id))
            .collect()
    }

    pub fn acceptors(&self) -> Vec<Arc<Acceptor<V>>> {
        self.inner
            .acceptors
            .iter()
            .filter_map(|id| self.acceptor(*id))
            .collect()
    }

    pub fn learners(&self) -> Vec<Arc<Learner<V>>> {
        self.inner
            .learners
            .iter()
            .filter_map(|id| self.learner(*id))
            .collect()
    }

    pub fn stats(&self) -> TransportStats {
        self.inner.stats.snapshot()
    }

    pub fn subscribe_to_events(&self) -> tokio::sync::broadcast::Receiver<PaxosEvent<V>> {
        self.inner.events.subscribe()
    }

    /// Broadcast a prepare to every acceptor.
    pub fn send_prepare(&self, prepare: Prepare) {
        for to in &self.inner.acceptors {
            self.deliver(*to, Message::Prepare(prepare));
        }
    }

    /// Unicast a promise to the proposer it answers.
    pub fn send_promise(&self, promise: Promise<V>) {
        if !self.inner.proposers.contains(&promise.to) {
            warn!("Promise addressed to unknown proposer {}", promise.to);
            return;
        }
        self.deliver(promise.to, Message::Promise(promise));
    }

    /// Broadcast an accept request to every acceptor.
    pub fn send_accept(&self, request: AcceptRequest<V>) {
        for to in &self.inner.acceptors {
            self.deliver(*to, Message::AcceptRequest(request.clone()));
        }
    }

    /// Broadcast an acceptor's vote to every learner.
    pub fn send_accepted(&self, accepted: Accepted<V>) {
        for to in &self.inner.learners {
            self.deliver(*to, Message::Accepted(accepted.clone()));
        }
    }

    /// Record the decided value. Only the first call has any effect.
    pub fn on_resolution(&self, resolution: Resolution<V>) {
        if self.inner.resolution.set(resolution.clone()).is_err() {
            return;
        }

        info!(
            "[ Resolution ] with proposal_id = {}, value = {:?}",
            resolution.proposal_id, resolution.value
        );
        if let Some(handler) = &self.inner.on_resolution {
            handler(&resolution);
        }
        self.inner.events.publish(PaxosEvent::Resolved {
            proposal_id: resolution.proposal_id,
            value: resolution.value,
        });
        self.inner.resolved.notify_waiters();

        if self.inner.config.stop_on_resolution {
            self.shutdown();
        }
    }

    pub fn resolution(&self) -> Option<Resolution<V>> {
        self.inner.resolution.get().cloned()
    }

    pub fn is_resolved(&self) -> bool {
        self.inner.resolution.get().is_some()
    }

    /// Wait until some learner decides.
    pub async fn wait_for_resolution(&self) -> Resolution<V> {
        loop {
            let notified = self.inner.resolved.notified();
            if let Some(resolution) = self.resolution() {
                return resolution;
            }
            notified.await;
        }
    }

    /// Stop every propose loop. Messages already in flight are still delivered.
    pub fn shutdown(&self) {
        if !self.inner.shutdown.swap(true, Ordering::SeqCst) {
            info!("Transport shut down");
            self.inner.events.publish(PaxosEvent::Shutdown);
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.inner.shutdown.load(Ordering::SeqCst)
    }

    /// Run a proposer until the transport shuts down.
    ///
    /// Each interval the proposer prepares again unless a promise arrived since the last
    /// wake-up, so lost messages are retried with a strictly higher proposal number.
    pub async fn begin_propose_loop(
        &self,
        proposer_id: ActorId,
        value: V,
    ) -> Result<(), PaxosError> {
        let proposer = self
            .proposer(proposer_id)
            .ok_or(PaxosError::UnknownProposer(proposer_id))?;
        proposer.set_proposal(value);

        let retry_interval = self.inner.config.retry_interval;
        while !self.is_shutdown() {
            if !proposer.promised_recently() {
                self.send_prepare(proposer.prepare());
            }
            sleep(retry_interval).await;
            proposer.clear_promised_recently();
        }

        trace!("[ {} ] propose loop stopped", proposer.name());
        Ok(())
    }

    /// Spawn [`Transport::begin_propose_loop`] as an independent task.
    ///
    /// The proposer id is checked before anything is spawned.
    pub fn spawn_propose_loop(
        &self,
        proposer_id: ActorId,
        value: V,
    ) -> Result<JoinHandle<()>, PaxosError> {
        if self.proposer(proposer_id).is_none() {
            return Err(PaxosError::UnknownProposer(proposer_id));
        }
        let transport = self.clone();
        Ok(tokio::spawn(async move {
            if let Err(err) = transport.begin_propose_loop(proposer_id, value).await {
                warn!("Propose loop for {proposer_id} failed: {err}");
            }
        }))
    }

    /// Hand one message to its own task, unless fault injection drops it.
    fn deliver(&self, to: ActorId, message: Message<V>) {
        if self.should_drop() {
            self.inner.stats.record_dropped();
            trace!(
                "Dropped {} for {to} with proposal_id = {}",
                message.phase(),
                message.proposal_id()
            );
            return;
        }

        let delay = self.sample_delay();
        self.inner.stats.record_sent();
        let transport = self.clone();
        tokio::spawn(async move {
            if !delay.is_zero() {
                sleep(delay).await;
            }
            transport.dispatch(to, message);
        });
    }

    fn should_drop(&self) -> bool {
        let loss_rate = self.inner.config.loss_rate;
        loss_rate > 0.0 && self.inner.rng.lock().gen_range(0.0_f64..1.0) < loss_rate
    }

    fn sample_delay(&self) -> Duration {
        let min_delay = self.inner.config.min_delay;
        let max_delay = self.inner.config.max_delay;
        if max_delay <= min_delay {
            return min_delay;
        }
        let micros = self
            .inner
            .rng
            .lock()
            .gen_range(min_delay.as_micros() as u64..=max_delay.as_micros() as u64);
        Duration::from_micros(micros)
    }

    /// Run the recipient's handler and route whatever it answers.
    fn dispatch(&self, to: ActorId, message: Message<V>) {
        match (self.inner.actors.get(&to), message) {
            (Some(Registered::Acceptor(acceptor)), Message::Prepare(prepare)) => {
                if let Some(promise) = acceptor.on_prepare(prepare.from, prepare.proposal_id) {
                    self.send_promise(promise);
                }
            }
            (Some(Registered::Acceptor(acceptor)), Message::AcceptRequest(request)) => {
                if let Some(accepted) =
                    acceptor.on_accept_request(request.from, request.proposal_id, request.value)
                {
                    self.send_accepted(accepted);
                }
            }
            (Some(Registered::Proposer(proposer)), Message::Promise(promise)) => {
                if let Some(request) = proposer.on_promise(promise, self.acceptor_count()) {
                    self.send_accept(request);
                }
            }
            (Some(Registered::Learner(learner)), Message::Accepted(accepted)) => {
                if let Some(resolution) = learner.on_accepted(accepted, self.acceptor_count()) {
                    self.on_resolution(resolution);
                }
            }
            (_, message) => {
                warn!("Cannot deliver {} to actor {to}", message.phase());
            }
        }
    }
}
