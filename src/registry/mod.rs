//! In-memory registry of tracked subscriptions.
//!
//! Each distinct request signature maps to one [`TrackedSubscription`]
//! holding its creation time, last use, usage count and the live handle
//! obtained from the feed transport. Application code only sees a
//! [`SubscriptionHandle`], which can ask for readiness but never tears the
//! subscription down.

mod manager;
mod types;

pub use manager::Registry;
pub use types::{SubscriptionHandle, TrackedSubscription};
