//! Main tracker tying the registry, gate and resume engine together.

use crate::error::{Result, TrackerError};
use crate::gate::PersistenceGate;
use crate::registry::{Registry, SubscriptionHandle};
use crate::resume;
use crate::signature::{Signature, SubscriptionRequest};
use crate::storage::MetadataStore;
use crate::transport::{FeedTransport, SubscribeCallbacks};
use crate::types::{ResumeState, StoredSubscription, Timestamp};
use crate::weighting::Weights;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Tracker configuration.
#[derive(Clone, Debug)]
pub struct TrackerConfig {
    /// Importance weights for resume order.
    pub weights: Weights,

    /// Interval between two replayed subscriptions during resume.
    /// Default: 200ms
    pub drain_interval: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            weights: Weights::default(),
            drain_interval: Duration::from_millis(200),
        }
    }
}

/// State shared between the tracker and its background threads.
pub(crate) struct Shared {
    pub(crate) config: TrackerConfig,
    pub(crate) registry: Arc<Mutex<Registry>>,
    pub(crate) transport: Arc<dyn FeedTransport>,
    pub(crate) store: Arc<dyn MetadataStore>,
    pub(crate) gate: PersistenceGate,
    state: Mutex<ResumeState>,
    state_changed: Condvar,
}

impl Shared {
    pub(crate) fn set_state(&self, state: ResumeState) {
        *self.state.lock() = state;
        self.state_changed.notify_all();
    }
}

/// Process-scoped subscription tracker.
///
/// Owns the registry of live subscriptions, the persistence gate and the
/// resume engine. Create one per process (or per test).
pub struct SubscriptionTracker {
    shared: Arc<Shared>,
    resume_started: AtomicBool,
}

impl SubscriptionTracker {
    /// Create a tracker. Nothing is loaded until [`start_resume`] is called.
    ///
    /// [`start_resume`]: SubscriptionTracker::start_resume
    pub fn new(
        config: TrackerConfig,
        store: Arc<dyn MetadataStore>,
        transport: Arc<dyn FeedTransport>,
    ) -> Self {
        let gate = PersistenceGate::new(Arc::clone(&store));
        Self {
            shared: Arc::new(Shared {
                config,
                registry: Arc::new(Mutex::new(Registry::new())),
                transport,
                store,
                gate,
                state: Mutex::new(ResumeState::Unloaded),
                state_changed: Condvar::new(),
            }),
            resume_started: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.shared.config
    }

    /// Subscribe to `request`, or reuse the live subscription for it.
    ///
    /// Fails only if the request can't be encoded, in which case nothing is
    /// tracked. Transport failures are logged and leave the record without
    /// a live handle; the returned handle then reports not ready.
    pub fn acquire(
        &self,
        request: &SubscriptionRequest,
        callbacks: Option<SubscribeCallbacks>,
    ) -> Result<SubscriptionHandle> {
        let signature = request.signature()?;

        {
            let mut registry = self.shared.registry.lock();
            let projection = registry.touch(
                &signature,
                request,
                callbacks.unwrap_or_default(),
                self.shared.transport.as_ref(),
                Timestamp::now(),
            );
            self.shared.gate.submit(&signature, projection);
        }

        Ok(SubscriptionHandle::new(signature, &self.shared.registry))
    }

    /// Start resuming persisted subscriptions in the background.
    ///
    /// Call once at startup, after the durable store is available.
    pub fn start_resume(&self) -> Result<ResumeTask> {
        if self.resume_started.swap(true, Ordering::SeqCst) {
            return Err(TrackerError::AlreadyStarted);
        }

        let shared = Arc::downgrade(&self.shared);
        let handle = thread::Builder::new()
            .name("subcache-resume".into())
            .spawn(move || resume::run(shared))?;

        Ok(ResumeTask { handle })
    }

    pub fn resume_state(&self) -> ResumeState {
        *self.shared.state.lock()
    }

    /// Block until the resume engine reaches `state`. Returns false on
    /// timeout.
    pub fn wait_for_state(&self, state: ResumeState, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut current = self.shared.state.lock();
        while *current != state {
            if self
                .shared
                .state_changed
                .wait_until(&mut current, deadline)
                .timed_out()
            {
                return *current == state;
            }
        }
        true
    }

    /// Whether record writes reach the durable store.
    pub fn is_loaded(&self) -> bool {
        self.shared.gate.is_open()
    }

    /// Projection of the record tracked for `signature`.
    pub fn tracked(&self, signature: &Signature) -> Option<StoredSubscription> {
        self.shared
            .registry
            .lock()
            .get(signature)
            .map(|sub| sub.projection())
    }

    /// Whether `signature` has a live transport subscription.
    pub fn is_live(&self, signature: &Signature) -> bool {
        self.shared
            .registry
            .lock()
            .get(signature)
            .map_or(false, |sub| sub.is_live())
    }

    /// Projections of every tracked record.
    pub fn snapshot(&self) -> Vec<(Signature, StoredSubscription)> {
        self.shared.registry.lock().projections()
    }

    pub fn len(&self) -> usize {
        self.shared.registry.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.registry.lock().is_empty()
    }

    /// Wait until every store write issued so far has been applied.
    pub fn sync_store(&self, timeout: Duration) -> bool {
        self.shared.gate.sync(timeout)
    }

    /// Wipe the durable store.
    ///
    /// Tracked records and live subscriptions are untouched; once the gate
    /// is open, later requests are persisted again.
    pub fn clear_persisted(&self) {
        self.shared.gate.clear();
    }
}

/// Background resume thread.
pub struct ResumeTask {
    handle: JoinHandle<()>,
}

impl ResumeTask {
    /// Wait for the resume thread to exit.
    pub fn join(self) -> thread::Result<()> {
        self.handle.join()
    }
}
