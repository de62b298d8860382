//! Shared test doubles for the feed transport and the durable store.

#![allow(dead_code)]

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use subcache::{
    FeedTransport, LiveHandle, MemoryStore, MetadataStore, Result, StoredSubscription,
    SubscribeCallbacks, SubscriptionRequest, SubscriptionTracker, Timestamp, TrackerConfig,
    TrackerError,
};

pub const WAIT: Duration = Duration::from_secs(5);
pub const TICK: Duration = Duration::from_millis(10);

pub fn request(name: &str) -> SubscriptionRequest {
    SubscriptionRequest::new(name)
}

pub fn key(name: &str) -> String {
    request(name).signature().unwrap().to_string()
}

pub fn stored(created: i64, updated: i64, count: u64) -> StoredSubscription {
    StoredSubscription {
        created_at: Timestamp(created),
        updated_at: Timestamp(updated),
        count,
    }
}

pub fn fast_config() -> TrackerConfig {
    TrackerConfig {
        drain_interval: TICK,
        ..Default::default()
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn tracker(store: Arc<dyn MetadataStore>, transport: Arc<RecordingTransport>) -> SubscriptionTracker {
    init_tracing();
    SubscriptionTracker::new(fast_config(), store, transport)
}

struct FlagHandle(Arc<AtomicBool>);

impl LiveHandle for FlagHandle {
    fn ready(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

type ErrorCallback = Box<dyn FnOnce(&TrackerError) + Send>;

/// Transport that records every subscribe call.
///
/// Error callbacks are queued and only run from `deliver_errors`, never
/// from inside `subscribe`.
#[derive(Default)]
pub struct RecordingTransport {
    calls: Mutex<Vec<(String, Instant)>>,
    rejected: Mutex<HashSet<String>>,
    ready: Arc<AtomicBool>,
    pending_errors: Mutex<Vec<(ErrorCallback, TrackerError)>>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Names subscribed so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().iter().map(|(_, at)| *at).collect()
    }

    pub fn calls_for(&self, name: &str) -> usize {
        self.calls.lock().iter().filter(|(n, _)| n == name).count()
    }

    pub fn reject(&self, name: &str) {
        self.rejected.lock().insert(name.to_string());
    }

    pub fn accept(&self, name: &str) {
        self.rejected.lock().remove(name);
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Run queued error callbacks on the calling thread.
    pub fn deliver_errors(&self) {
        let pending = std::mem::take(&mut *self.pending_errors.lock());
        for (on_error, err) in pending {
            on_error(&err);
        }
    }
}

impl FeedTransport for RecordingTransport {
    fn subscribe(
        &self,
        request: &SubscriptionRequest,
        callbacks: SubscribeCallbacks,
    ) -> Result<Arc<dyn LiveHandle>> {
        self.calls
            .lock()
            .push((request.name().to_string(), Instant::now()));

        if self.rejected.lock().contains(request.name()) {
            let message = format!("{} rejected", request.name());
            if let Some(on_error) = callbacks.on_error {
                self.pending_errors
                    .lock()
                    .push((on_error, TrackerError::Transport(message.clone())));
            }
            return Err(TrackerError::Transport(message));
        }

        Ok(Arc::new(FlagHandle(Arc::clone(&self.ready))))
    }
}

/// Memory store that counts writes and can refuse reads.
#[derive(Default)]
pub struct RecordingStore {
    inner: MemoryStore,
    writes: AtomicUsize,
    fail_reads: AtomicBool,
}

impl RecordingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_items(items: Vec<(String, StoredSubscription)>) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryStore::with_items(items.into_iter().collect::<HashMap<_, _>>()),
            ..Default::default()
        })
    }

    pub fn failing_reads() -> Arc<Self> {
        let store = Self::default();
        store.fail_reads.store(true, Ordering::SeqCst);
        Arc::new(store)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn get(&self, key: &str) -> Option<StoredSubscription> {
        self.inner.get(key)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

impl MetadataStore for RecordingStore {
    fn get_all(&self) -> Result<HashMap<String, StoredSubscription>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(TrackerError::StoreRead("storage unavailable".into()));
        }
        self.inner.get_all()
    }

    fn set_item(&self, key: &str, record: &StoredSubscription) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set_item(key, record)
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.inner.remove_item(key)
    }

    fn clear(&self) -> Result<()> {
        self.inner.clear()
    }
}
