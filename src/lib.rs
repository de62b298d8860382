//! # Subscription Cache
//!
//! A bounded, persisted cache of live feed subscriptions. Subscriptions
//! requested by the application are tracked by a canonical signature,
//! their usage is recorded in a durable store, and after a restart the most
//! important ones are re-established at a throttled rate.
//!
//! ## Core Concepts
//!
//! - **Signature**: Canonical JSON key of a request (name plus parameters)
//! - **Registry**: In-memory records with a live handle per signature
//! - **Weighting**: Age, recency and usage decide the resume order
//! - **Resume**: Persisted records replayed one per tick at startup
//! - **Gate**: Writes reach the store only once resume has finished
//!
//! ## Example
//!
//! ```ignore
//! use subcache::{FileStore, StoreConfig, SubscriptionRequest, SubscriptionTracker, TrackerConfig};
//!
//! let store = Arc::new(FileStore::open(StoreConfig {
//!     path: "./meta".into(),
//!     ..Default::default()
//! })?);
//! let tracker = SubscriptionTracker::new(TrackerConfig::default(), store, transport);
//!
//! // Startup hook
//! tracker.start_resume()?;
//!
//! // Application subscriptions
//! let handle = tracker.acquire(&SubscriptionRequest::new("posts").param("inbox")?, None)?;
//! if handle.ready() {
//!     // render
//! }
//! ```

pub mod error;
pub mod gate;
pub mod registry;
pub mod resume;
pub mod signature;
pub mod storage;
pub mod tracker;
pub mod transport;
pub mod types;
pub mod weighting;

// Re-exports
pub use error::{Result, TrackerError};
pub use gate::PersistenceGate;
pub use registry::{Registry, SubscriptionHandle, TrackedSubscription};
pub use resume::{ReplayOutcome, ResumeEntry, ResumeQueue};
pub use signature::{Signature, SubscriptionRequest};
pub use storage::{FileStore, MemoryStore, MetadataStore, StoreConfig};
pub use tracker::{ResumeTask, SubscriptionTracker, TrackerConfig};
pub use transport::{FeedTransport, LiveHandle, SubscribeCallbacks};
pub use types::*;
pub use weighting::Weights;
