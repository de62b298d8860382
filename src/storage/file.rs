//! File-backed metadata store.
//!
//! Layout of `<name>.bin`:
//!
//! ```text
//! magic "SUB\0" | format version u8 | store version (u16 len + utf8)
//! | payload len u64 | MessagePack map<signature, projection> | crc32 u32
//! ```
//!
//! The file is rewritten whole on every change through a temp file and a
//! rename. Nothing is cached in memory between calls.

use super::{MetadataStore, StoreConfig};
use crate::error::{Result, TrackerError};
use crate::types::StoredSubscription;
use fs2::FileExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

/// Magic bytes for store files.
const STORE_MAGIC: &[u8; 4] = b"SUB\0";

/// Current store file format version.
const STORE_FORMAT_VERSION: u8 = 1;

/// Metadata store persisted to a single file.
pub struct FileStore {
    config: StoreConfig,

    /// Path to the data file.
    data_path: PathBuf,

    /// Lock file for exclusive access.
    _lock_file: File,

    /// Serializes read-modify-write cycles.
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open the store described by `config`.
    pub fn open(config: StoreConfig) -> Result<Self> {
        if !config.path.exists() {
            if config.create_if_missing {
                fs::create_dir_all(&config.path)?;
            } else {
                return Err(TrackerError::Io(std::io::Error::new(
                    ErrorKind::NotFound,
                    format!("store directory {} does not exist", config.path.display()),
                )));
            }
        }

        let lock_file = Self::acquire_lock(&config.path, &config.name)?;
        let data_path = config.path.join(format!("{}.bin", config.name));

        Ok(Self {
            config,
            data_path,
            _lock_file: lock_file,
            write_lock: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Path of the data file.
    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    fn acquire_lock(dir: &Path, name: &str) -> Result<File> {
        let lock_file = File::create(dir.join(format!("{name}.lock")))?;

        lock_file
            .try_lock_exclusive()
            .map_err(|_| TrackerError::Locked)?;

        Ok(lock_file)
    }

    fn read_items(&self) -> Result<HashMap<String, StoredSubscription>> {
        let mut file = match File::open(&self.data_path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(e.into()),
        };

        let mut magic = [0u8; 4];
        file.read_exact(&mut magic)?;
        if &magic != STORE_MAGIC {
            return Err(TrackerError::InvalidFormat("Invalid store magic".into()));
        }

        let mut format = [0u8; 1];
        file.read_exact(&mut format)?;
        if format[0] != STORE_FORMAT_VERSION {
            return Err(TrackerError::InvalidFormat(format!(
                "Unsupported store format version: {}",
                format[0]
            )));
        }

        let mut version_len = [0u8; 2];
        file.read_exact(&mut version_len)?;
        let mut version = vec![0u8; u16::from_le_bytes(version_len) as usize];
        file.read_exact(&mut version)?;
        let version = String::from_utf8_lossy(&version);
        if version.as_ref() != self.config.version.as_str() {
            tracing::info!(
                store = %self.config.name,
                found = %version,
                expected = %self.config.version,
                "discarding subscription metadata written by another store version"
            );
            return Ok(HashMap::new());
        }

        let mut len_bytes = [0u8; 8];
        file.read_exact(&mut len_bytes)?;
        let len = u64::from_le_bytes(len_bytes) as usize;

        if len > 64 * 1024 * 1024 {
            return Err(TrackerError::InvalidFormat("Store payload too large".into()));
        }

        let mut encoded = vec![0u8; len];
        file.read_exact(&mut encoded)?;

        let mut checksum_bytes = [0u8; 4];
        file.read_exact(&mut checksum_bytes)?;
        let expected = u32::from_le_bytes(checksum_bytes);
        let got = crc32fast::hash(&encoded);
        if expected != got {
            return Err(TrackerError::ChecksumMismatch { expected, got });
        }

        Ok(rmp_serde::from_slice(&encoded)?)
    }

    fn write_items(&self, items: &HashMap<String, StoredSubscription>) -> Result<()> {
        let encoded = rmp_serde::to_vec(items)?;
        let version = self.config.version.as_bytes();
        let version_len = u16::try_from(version.len())
            .map_err(|_| TrackerError::InvalidFormat("Store version too long".into()))?;

        let mut bytes = Vec::with_capacity(4 + 1 + 2 + version.len() + 8 + encoded.len() + 4);
        bytes.extend_from_slice(STORE_MAGIC);
        bytes.push(STORE_FORMAT_VERSION);
        bytes.extend_from_slice(&version_len.to_le_bytes());
        bytes.extend_from_slice(version);
        bytes.extend_from_slice(&(encoded.len() as u64).to_le_bytes());
        bytes.extend_from_slice(&encoded);
        bytes.extend_from_slice(&crc32fast::hash(&encoded).to_le_bytes());

        let tmp_path = self.tmp_path();
        let result = Self::replace_file(&tmp_path, &self.data_path, &bytes);
        if result.is_err() {
            let _ = fs::remove_file(&tmp_path);
        }
        result
    }

    fn replace_file(tmp_path: &Path, dest: &Path, bytes: &[u8]) -> Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(tmp_path, dest)?;
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        self.data_path.with_extension("bin.tmp")
    }

    /// Contents to rewrite after a failed read.
    ///
    /// A damaged or foreign file is replaced with an empty map. Any other
    /// failure is passed up so a transient I/O error never erases data.
    fn recover_items(
        &self,
        read: Result<HashMap<String, StoredSubscription>>,
    ) -> Result<HashMap<String, StoredSubscription>> {
        match read {
            Ok(items) => Ok(items),
            Err(
                e @ (TrackerError::InvalidFormat(_)
                | TrackerError::ChecksumMismatch { .. }
                | TrackerError::Deserialization(_)),
            ) => {
                tracing::warn!(store = %self.config.name, error = %e, "overwriting unreadable subscription store");
                Ok(HashMap::new())
            }
            Err(TrackerError::Io(e)) if e.kind() == ErrorKind::UnexpectedEof => {
                tracing::warn!(store = %self.config.name, error = %e, "overwriting truncated subscription store");
                Ok(HashMap::new())
            }
            Err(e) => Err(e),
        }
    }

    fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut HashMap<String, StoredSubscription>),
    {
        let _lock = self.write_lock.lock();
        let mut items = self.recover_items(self.read_items())?;
        f(&mut items);
        self.write_items(&items)
    }
}

impl MetadataStore for FileStore {
    fn get_all(&self) -> Result<HashMap<String, StoredSubscription>> {
        self.read_items()
            .map_err(|e| TrackerError::StoreRead(e.to_string()))
    }

    fn set_item(&self, key: &str, record: &StoredSubscription) -> Result<()> {
        self.update(|items| {
            items.insert(key.to_string(), *record);
        })
        .map_err(|e| TrackerError::StoreWrite(e.to_string()))
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.update(|items| {
            items.remove(key);
        })
        .map_err(|e| TrackerError::StoreWrite(e.to_string()))
    }

    fn clear(&self) -> Result<()> {
        self.update(|items| items.clear())
            .map_err(|e| TrackerError::StoreWrite(e.to_string()))
    }
}
