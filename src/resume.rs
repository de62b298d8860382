//! Throttled resume of persisted subscriptions.
//!
//! On startup the whole durable store is read once, ordered by importance
//! and replayed one record per tick. A record whose signature the
//! application already re-requested is merged into the live record instead
//! of subscribing again. When the queue is empty the persistence gate opens
//! and every tracked record is flushed.

use crate::error::TrackerError;
use crate::signature::Signature;
use crate::tracker::Shared;
use crate::transport::SubscribeCallbacks;
use crate::types::{ResumeState, StoredSubscription};
use crate::weighting::Weights;
use std::collections::{HashMap, VecDeque};
use std::sync::Weak;
use std::time::Duration;

/// How long the end-of-drain flush may take before the engine goes idle
/// without confirmation.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(30);

/// A persisted record awaiting replay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResumeEntry {
    /// Signature the record was stored under.
    pub id: Signature,
    pub record: StoredSubscription,
}

/// Persisted records in replay order, drained front to back.
#[derive(Debug, Default)]
pub struct ResumeQueue {
    entries: VecDeque<ResumeEntry>,
}

impl ResumeQueue {
    /// Build the queue from a bulk load, highest priority first.
    pub fn from_stored(stored: HashMap<String, StoredSubscription>, weights: &Weights) -> Self {
        let mut entries: Vec<ResumeEntry> = stored
            .into_iter()
            .map(|(key, record)| ResumeEntry {
                id: Signature::from_key(key),
                record,
            })
            .collect();

        weights.sort_by_key_fn(&mut entries, |entry| &entry.record);

        Self {
            entries: entries.into(),
        }
    }

    pub fn pop_front(&mut self) -> Option<ResumeEntry> {
        self.entries.pop_front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResumeEntry> {
        self.entries.iter()
    }
}

/// What a single drain tick did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplayOutcome {
    /// Folded into a record the application created first.
    Merged,
    /// Re-subscribed through the transport.
    Resumed,
    /// Could not be replayed and was discarded.
    Dropped,
}

/// Replay one persisted record onto the registry.
pub(crate) fn replay(shared: &Shared, entry: ResumeEntry) -> ReplayOutcome {
    let mut registry = shared.registry.lock();

    if registry.merge_persisted(&entry.id, &entry.record) {
        tracing::debug!(signature = %entry.id, count = entry.record.count, "merged persisted subscription");
        return ReplayOutcome::Merged;
    }

    let handle = entry
        .id
        .to_request()
        .and_then(|request| shared.transport.subscribe(&request, SubscribeCallbacks::default()))
        .map_err(|e| match e {
            TrackerError::Replay(_) => e,
            other => TrackerError::Replay(other.to_string()),
        });

    match handle {
        Ok(handle) => {
            registry.insert_resumed(entry.id.clone(), &entry.record, handle);
            tracing::debug!(signature = %entry.id, "resumed subscription");
            ReplayOutcome::Resumed
        }
        Err(e) => {
            tracing::warn!(signature = %entry.id, error = %e, "could not resume subscription");
            ReplayOutcome::Dropped
        }
    }
}

/// Open the gate, flush every tracked record and go idle.
pub(crate) fn finish(shared: &Shared) {
    {
        let registry = shared.registry.lock();
        shared.gate.open_and_flush(registry.projections());
    }

    if !shared.gate.sync(FLUSH_TIMEOUT) {
        tracing::warn!("flush of tracked subscriptions not confirmed");
    }

    shared.set_state(ResumeState::Idle);
    tracing::info!("subscription resume complete");
}

/// Body of the resume thread.
///
/// Holds only a weak reference between ticks: once the tracker is dropped
/// the drain stops at the next tick.
pub(crate) fn run(shared: Weak<Shared>) {
    let (mut queue, interval) = {
        let Some(s) = shared.upgrade() else {
            return;
        };

        s.set_state(ResumeState::Loading);
        let stored = match s.store.get_all() {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(error = %e, "subscriptions could not resume");
                s.set_state(ResumeState::Unloaded);
                return;
            }
        };

        let queue = ResumeQueue::from_stored(stored, &s.config.weights);
        tracing::info!(records = queue.len(), "resuming persisted subscriptions");
        s.set_state(ResumeState::Draining);
        (queue, s.config.drain_interval)
    };

    let ticker = crossbeam_channel::tick(interval);
    loop {
        if ticker.recv().is_err() {
            return;
        }

        let Some(s) = shared.upgrade() else {
            tracing::debug!(remaining = queue.len(), "tracker dropped, abandoning resume");
            return;
        };

        match queue.pop_front() {
            Some(entry) => {
                replay(&s, entry);
            }
            None => {
                finish(&s);
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Timestamp;

    fn stored(created: i64, updated: i64, count: u64) -> StoredSubscription {
        StoredSubscription {
            created_at: Timestamp(created),
            updated_at: Timestamp(updated),
            count,
        }
    }

    #[test]
    fn test_queue_is_sorted_once_by_weight() {
        let mut stored_map = HashMap::new();
        stored_map.insert(r#"["light"]"#.to_string(), stored(150, 300, 1));
        stored_map.insert(r#"["heavy"]"#.to_string(), stored(50, 100, 9));
        stored_map.insert(r#"["middle"]"#.to_string(), stored(100, 200, 5));

        let mut queue = ResumeQueue::from_stored(stored_map, &Weights::default());
        assert_eq!(queue.len(), 3);

        let order: Vec<_> = std::iter::from_fn(|| queue.pop_front())
            .map(|e| e.id.to_string())
            .collect();
        assert_eq!(order, vec![r#"["heavy"]"#, r#"["middle"]"#, r#"["light"]"#]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_queue_keeps_keys_as_ids() {
        let mut stored_map = HashMap::new();
        stored_map.insert(r#"["posts",1]"#.to_string(), stored(1, 2, 3));

        let queue = ResumeQueue::from_stored(stored_map, &Weights::default());
        let entry = queue.iter().next().unwrap();
        assert_eq!(entry.id.as_str(), r#"["posts",1]"#);
        assert_eq!(entry.record, stored(1, 2, 3));
    }

    #[test]
    fn test_empty_queue() {
        let queue = ResumeQueue::from_stored(HashMap::new(), &Weights::default());
        assert!(queue.is_empty());
    }
}
