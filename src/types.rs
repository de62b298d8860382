//! Core types for subscription tracking.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Microseconds since Unix epoch.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Current time.
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Timestamp(duration.as_micros() as i64)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

/// The persisted projection of a tracked subscription.
///
/// This is everything the durable store ever sees: the live handle is
/// never part of it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSubscription {
    /// When the signature was first requested.
    pub created_at: Timestamp,
    /// When the signature was most recently requested.
    pub updated_at: Timestamp,
    /// How many times the signature has been requested.
    pub count: u64,
}

/// Lifecycle of the resume engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResumeState {
    /// Nothing loaded yet, or the bulk load failed.
    Unloaded,
    /// Bulk load from the durable store in flight.
    Loading,
    /// Replaying persisted records one per tick.
    Draining,
    /// Drain finished and the persistence gate is open. Terminal.
    Idle,
}

impl fmt::Display for ResumeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResumeState::Unloaded => "unloaded",
            ResumeState::Loading => "loading",
            ResumeState::Draining => "draining",
            ResumeState::Idle => "idle",
        };
        f.write_str(name)
    }
}
