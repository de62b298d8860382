//! Persistence gate and background writer.
//!
//! Record writes are dropped until the gate opens at the end of the resume
//! drain. After that, each registry mutation queues one fire-and-forget write
//! of the record's projection. Writes are applied by a single writer thread
//! in the order they were queued; failures are logged and otherwise ignored.

use crate::signature::Signature;
use crate::storage::MetadataStore;
use crate::types::StoredSubscription;
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

enum WriteCommand {
    Set {
        signature: Signature,
        record: StoredSubscription,
    },
    Clear,
    /// Acknowledged once every earlier command has been applied.
    Sync(Sender<()>),
}

/// Gate controlling when record projections reach the durable store.
pub struct PersistenceGate {
    loaded: AtomicBool,
    sender: Option<Sender<WriteCommand>>,
    writer: Option<JoinHandle<()>>,
}

impl PersistenceGate {
    /// Create a closed gate writing to `store`.
    pub fn new(store: Arc<dyn MetadataStore>) -> Self {
        let (sender, receiver) = unbounded();
        let spawned = thread::Builder::new()
            .name("subcache-writer".into())
            .spawn(move || run_writer(store, receiver));
        let writer = match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!(error = %e, "could not spawn store writer, writes disabled");
                None
            }
        };

        Self {
            loaded: AtomicBool::new(false),
            sender: writer.as_ref().map(|_| sender),
            writer,
        }
    }

    /// Whether record writes currently reach the store.
    pub fn is_open(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    /// Queue a write of one record. Returns false if the gate is closed and
    /// the write was dropped.
    pub fn submit(&self, signature: &Signature, record: StoredSubscription) -> bool {
        if !self.is_open() {
            tracing::trace!(signature = %signature, "gate closed, dropping write");
            return false;
        }
        self.send(WriteCommand::Set {
            signature: signature.clone(),
            record,
        });
        true
    }

    /// Open the gate and queue a write of every given record.
    ///
    /// Callers hold the registry lock so no single-record write can be
    /// queued between opening and the flush.
    pub(crate) fn open_and_flush(&self, records: Vec<(Signature, StoredSubscription)>) {
        self.loaded.store(true, Ordering::SeqCst);
        tracing::debug!(records = records.len(), "persistence gate open, flushing tracked subscriptions");
        for (signature, record) in records {
            self.send(WriteCommand::Set { signature, record });
        }
    }

    /// Queue a wipe of the store, ordered after every write queued so far.
    pub fn clear(&self) {
        self.send(WriteCommand::Clear);
    }

    /// Wait until every command queued so far has been applied.
    ///
    /// Returns false on timeout or if the writer is gone.
    pub fn sync(&self, timeout: Duration) -> bool {
        let (ack, done) = bounded(1);
        if !self.send(WriteCommand::Sync(ack)) {
            return false;
        }
        done.recv_timeout(timeout).is_ok()
    }

    fn send(&self, command: WriteCommand) -> bool {
        match &self.sender {
            Some(sender) => sender.send(command).is_ok(),
            None => false,
        }
    }
}

impl Drop for PersistenceGate {
    fn drop(&mut self) {
        // Closing the channel lets the writer finish the queue and exit.
        self.sender.take();
        if let Some(writer) = self.writer.take() {
            let _ = writer.join();
        }
    }
}

fn run_writer(store: Arc<dyn MetadataStore>, receiver: Receiver<WriteCommand>) {
    for command in receiver {
        match command {
            WriteCommand::Set { signature, record } => {
                if let Err(e) = store.set_item(signature.as_str(), &record) {
                    tracing::warn!(signature = %signature, error = %e, "failed to persist subscription");
                }
            }
            WriteCommand::Clear => {
                if let Err(e) = store.clear() {
                    tracing::warn!(error = %e, "failed to clear persisted subscriptions");
                }
            }
            WriteCommand::Sync(ack) => {
                let _ = ack.send(());
            }
        }
    }
}
