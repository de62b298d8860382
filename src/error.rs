//! Error types for subscription tracking.

use thiserror::Error;

/// Main error type for tracker operations.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// A request component could not be turned into a signature.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// The bulk load of persisted subscriptions failed.
    #[error("Store read error: {0}")]
    StoreRead(String),

    /// A single persistence write failed.
    #[error("Store write error: {0}")]
    StoreWrite(String),

    /// A persisted record could not be turned back into a live subscription.
    #[error("Replay error: {0}")]
    Replay(String),

    /// The feed transport rejected a subscription.
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Resume already started")]
    AlreadyStarted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Invalid store format: {0}")]
    InvalidFormat(String),

    #[error("Checksum mismatch: expected {expected}, got {got}")]
    ChecksumMismatch { expected: u32, got: u32 },

    #[error("Store is locked by another process")]
    Locked,
}

impl From<serde_json::Error> for TrackerError {
    fn from(e: serde_json::Error) -> Self {
        TrackerError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::encode::Error> for TrackerError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        TrackerError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for TrackerError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        TrackerError::Deserialization(e.to_string())
    }
}

/// Result type for tracker operations.
pub type Result<T> = std::result::Result<T, TrackerError>;
