//! Durable metadata storage for tracked subscriptions.
//!
//! The tracker only ever persists the handle-free projection of a record
//! ([`StoredSubscription`]), keyed by signature. Two backends are provided:
//!
//! - [`MemoryStore`]: process-local, for ephemeral sessions and tests
//! - [`FileStore`]: a single checksummed MessagePack file per store name
//!
//! Store calls may block. The tracker only issues them from its background
//! threads, never from `acquire`.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::Result;
use crate::types::StoredSubscription;
use std::collections::HashMap;
use std::path::PathBuf;

/// Key-value persistence for subscription projections.
pub trait MetadataStore: Send + Sync {
    /// Read every stored record in one bulk operation.
    fn get_all(&self) -> Result<HashMap<String, StoredSubscription>>;

    /// Insert or overwrite one record.
    fn set_item(&self, key: &str, record: &StoredSubscription) -> Result<()>;

    /// Delete one record. Missing keys are not an error.
    fn remove_item(&self, key: &str) -> Result<()>;

    /// Delete every record.
    fn clear(&self) -> Result<()>;
}

/// File store configuration.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Directory holding the store files.
    pub path: PathBuf,

    /// Store name. Selects the file `<path>/<name>.bin`.
    pub name: String,

    /// Store version. Data written under another version is discarded.
    pub version: String,

    /// Whether to create the directory if it doesn't exist.
    pub create_if_missing: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./store"),
            name: "subscriptions".to_string(),
            version: "1.1".to_string(),
            create_if_missing: true,
        }
    }
}
