//! Canonical signatures for subscription requests.
//!
//! A request is a name plus an ordered list of JSON values. Its signature is
//! the compact JSON encoding of `[name, param0, param1, ...]`. Objects are
//! encoded with sorted keys, so logically equal requests always produce the
//! same string, and the string can be parsed back into an equivalent request
//! when persisted subscriptions are resumed.

use crate::error::{Result, TrackerError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A named, parameterized request for a remote data feed.
#[derive(Clone, Debug, PartialEq)]
pub struct SubscriptionRequest {
    name: String,
    params: Vec<Value>,
}

impl SubscriptionRequest {
    /// Create a request with no parameters.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
        }
    }

    /// Append a parameter, encoding it as JSON.
    ///
    /// Fails with [`TrackerError::Encoding`] if the value has no JSON
    /// representation (for example a map with non-string keys).
    pub fn param<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self> {
        let value = serde_json::to_value(value).map_err(|e| TrackerError::Encoding(e.to_string()))?;
        self.params.push(value);
        Ok(self)
    }

    /// Append an already-encoded parameter.
    pub fn value(mut self, value: Value) -> Self {
        self.params.push(value);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// Build the canonical signature for this request.
    pub fn signature(&self) -> Result<Signature> {
        Signature::build(self)
    }
}

/// Canonical string key identifying a subscription request.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(String);

impl Signature {
    /// Serialize a request into its signature.
    pub fn build(request: &SubscriptionRequest) -> Result<Self> {
        let mut parts = Vec::with_capacity(request.params.len() + 1);
        parts.push(Value::String(request.name.clone()));
        parts.extend(request.params.iter().cloned());

        serde_json::to_string(&parts)
            .map(Signature)
            .map_err(|e| TrackerError::Encoding(e.to_string()))
    }

    /// Wrap a key read back from the durable store.
    pub fn from_key(key: impl Into<String>) -> Self {
        Signature(key.into())
    }

    /// Reconstruct the request this signature was built from.
    pub fn to_request(&self) -> Result<SubscriptionRequest> {
        let parts: Vec<Value> = serde_json::from_str(&self.0)
            .map_err(|e| TrackerError::Replay(format!("malformed signature: {e}")))?;

        let mut parts = parts.into_iter();
        match parts.next() {
            Some(Value::String(name)) => Ok(SubscriptionRequest {
                name,
                params: parts.collect(),
            }),
            _ => Err(TrackerError::Replay(format!(
                "signature has no subscription name: {}",
                self.0
            ))),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self.0)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
