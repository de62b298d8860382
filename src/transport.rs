//! Interface to the remote data-feed transport.

use crate::error::{Result, TrackerError};
use crate::signature::SubscriptionRequest;
use std::fmt;
use std::sync::Arc;

/// A live subscription owned by the feed transport.
pub trait LiveHandle: Send + Sync {
    /// Whether the remote source has delivered its initial data set.
    fn ready(&self) -> bool;
}

/// Issues remote subscriptions.
///
/// `subscribe` is called while the tracker holds its registry lock, so it
/// must return promptly and must not call back into the tracker from the
/// calling thread. Neither callback may run before `subscribe` returns;
/// they are invoked later, from any thread.
pub trait FeedTransport: Send + Sync {
    fn subscribe(
        &self,
        request: &SubscriptionRequest,
        callbacks: SubscribeCallbacks,
    ) -> Result<Arc<dyn LiveHandle>>;
}

type ReadyCallback = Box<dyn FnOnce() + Send>;
type ErrorCallback = Box<dyn FnOnce(&TrackerError) + Send>;

/// Callbacks handed to the transport with a new subscription.
///
/// They are passed through untouched and are never part of the signature.
#[derive(Default)]
pub struct SubscribeCallbacks {
    pub on_ready: Option<ReadyCallback>,
    pub on_error: Option<ErrorCallback>,
}

impl SubscribeCallbacks {
    /// Callbacks with only a ready notification.
    pub fn on_ready(f: impl FnOnce() + Send + 'static) -> Self {
        Self {
            on_ready: Some(Box::new(f)),
            on_error: None,
        }
    }

    /// Add an error notification.
    pub fn with_on_error(mut self, f: impl FnOnce(&TrackerError) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.on_ready.is_none() && self.on_error.is_none()
    }
}

impl fmt::Debug for SubscribeCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscribeCallbacks")
            .field("on_ready", &self.on_ready.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}
