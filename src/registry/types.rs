//! Registry entry and handle types.

use super::manager::Registry;
use crate::signature::Signature;
use crate::transport::LiveHandle;
use crate::types::{StoredSubscription, Timestamp};
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};

/// In-memory state for one signature.
pub struct TrackedSubscription {
    /// When the signature was first requested.
    pub created_at: Timestamp,
    /// When the signature was most recently requested.
    pub updated_at: Timestamp,
    /// Usage counter.
    pub count: u64,
    /// Live transport subscription. Absent until the transport accepted it.
    pub(crate) handle: Option<Arc<dyn LiveHandle>>,
}

impl TrackedSubscription {
    pub(crate) fn new(now: Timestamp) -> Self {
        Self {
            created_at: now,
            updated_at: now,
            count: 0,
            handle: None,
        }
    }

    pub(crate) fn resumed(stored: &StoredSubscription, handle: Arc<dyn LiveHandle>) -> Self {
        Self {
            created_at: stored.created_at,
            updated_at: stored.updated_at,
            count: stored.count,
            handle: Some(handle),
        }
    }

    /// The handle-free projection written to the durable store.
    pub fn projection(&self) -> StoredSubscription {
        StoredSubscription {
            created_at: self.created_at,
            updated_at: self.updated_at,
            count: self.count,
        }
    }

    /// Whether the transport holds a live subscription for this record.
    pub fn is_live(&self) -> bool {
        self.handle.is_some()
    }

    pub fn handle(&self) -> Option<&Arc<dyn LiveHandle>> {
        self.handle.as_ref()
    }
}

impl fmt::Debug for TrackedSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedSubscription")
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .field("count", &self.count)
            .field("live", &self.is_live())
            .finish()
    }
}

/// Handle returned to application code by `acquire`.
///
/// Dropping or stopping it never tears down the live subscription: tracked
/// data stays subscribed for the lifetime of the process.
#[derive(Clone)]
pub struct SubscriptionHandle {
    signature: Signature,
    registry: Weak<Mutex<Registry>>,
}

impl SubscriptionHandle {
    pub(crate) fn new(signature: Signature, registry: &Arc<Mutex<Registry>>) -> Self {
        Self {
            signature,
            registry: Arc::downgrade(registry),
        }
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Whether the underlying live subscription is ready.
    ///
    /// False while the transport has not (yet) accepted the subscription.
    pub fn ready(&self) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            return false;
        };
        let live = registry
            .lock()
            .get(&self.signature)
            .and_then(|sub| sub.handle.clone());
        live.map_or(false, |handle| handle.ready())
    }

    /// No-op. Subscriptions are kept alive so their data stays local.
    pub fn stop(&self) {}
}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("signature", &self.signature)
            .finish()
    }
}
