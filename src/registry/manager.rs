//! Registry of tracked subscriptions.

use super::types::TrackedSubscription;
use crate::signature::{Signature, SubscriptionRequest};
use crate::transport::{FeedTransport, LiveHandle, SubscribeCallbacks};
use crate::types::{StoredSubscription, Timestamp};
use std::collections::HashMap;
use std::sync::Arc;

/// Authoritative map of what is currently tracked, keyed by signature.
///
/// Records are created on first request and updated on every later one;
/// they are never removed.
#[derive(Default)]
pub struct Registry {
    entries: HashMap<Signature, TrackedSubscription>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, signature: &Signature) -> Option<&TrackedSubscription> {
        self.entries.get(signature)
    }

    pub fn contains(&self, signature: &Signature) -> bool {
        self.entries.contains_key(signature)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Handle-free projections of every tracked record.
    pub fn projections(&self) -> Vec<(Signature, StoredSubscription)> {
        self.entries
            .iter()
            .map(|(sig, sub)| (sig.clone(), sub.projection()))
            .collect()
    }

    /// Record one application request for `signature`.
    ///
    /// Creates the record if needed, asks the transport for a live handle if
    /// the record has none, then bumps `updated_at` and `count`. A transport
    /// failure leaves the record without a handle so the next request
    /// retries. Returns the updated projection.
    pub fn touch(
        &mut self,
        signature: &Signature,
        request: &SubscriptionRequest,
        callbacks: SubscribeCallbacks,
        transport: &dyn FeedTransport,
        now: Timestamp,
    ) -> StoredSubscription {
        let sub = self
            .entries
            .entry(signature.clone())
            .or_insert_with(|| TrackedSubscription::new(now));

        if sub.handle.is_none() {
            match transport.subscribe(request, callbacks) {
                Ok(handle) => sub.handle = Some(handle),
                Err(e) => {
                    tracing::warn!(signature = %signature, error = %e, "feed transport rejected subscription");
                }
            }
        } else if !callbacks.is_empty() {
            tracing::debug!(signature = %signature, "subscription already live, callbacks not forwarded");
        }

        sub.updated_at = now.max(sub.created_at);
        sub.count += 1;
        sub.projection()
    }

    /// Fold a persisted record into a live one created before resume
    /// reached it. Returns false if the signature isn't tracked.
    pub fn merge_persisted(&mut self, signature: &Signature, stored: &StoredSubscription) -> bool {
        match self.entries.get_mut(signature) {
            Some(sub) => {
                sub.count += stored.count;
                sub.created_at = sub.created_at.min(stored.created_at);
                true
            }
            None => false,
        }
    }

    /// Insert a record replayed from the durable store.
    pub fn insert_resumed(
        &mut self,
        signature: Signature,
        stored: &StoredSubscription,
        handle: Arc<dyn LiveHandle>,
    ) {
        self.entries
            .insert(signature, TrackedSubscription::resumed(stored, handle));
    }
}
