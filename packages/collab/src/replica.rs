//! CRDT replica of an outline document.
//!
//! The persisted outline JSON lives in a shared Yjs text. Local writes
//! raise the local-changes signal until they are flushed as an update;
//! applying a remote update raises the sync signal.

use crate::error::ReplicaError;
use crate::provider::{ProviderEvent, ReplicationProvider};
use outliner_editor::{Document, DocumentOptions};
use serde::de::{Deserialize, IgnoredAny};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio::sync::broadcast;
use yrs::updates::decoder::Decode;
use yrs::{Doc, GetString, ReadTxn, StateVector, Text, TextRef, Transact, Update};

const EVENT_CAPACITY: usize = 64;

/// Syntax check without building a value, at any nesting depth
fn check_json(json: &str) -> Result<(), serde_json::Error> {
    let mut de = serde_json::Deserializer::from_str(json);
    de.disable_recursion_limit();
    IgnoredAny::deserialize(serde_stacker::Deserializer::new(&mut de))?;
    de.end()
}

pub struct Replica {
    doc: Doc,
    text: TextRef,

    synced: AtomicBool,
    local_changes: AtomicBool,

    /// State already encoded by [`Replica::flush`]
    flushed: Mutex<StateVector>,

    events: broadcast::Sender<ProviderEvent>,
}

impl Replica {
    pub fn new() -> Self {
        let doc = Doc::new();
        let text = doc.get_or_insert_text("outline");
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            doc,
            text,
            synced: AtomicBool::new(false),
            local_changes: AtomicBool::new(false),
            flushed: Mutex::new(StateVector::default()),
            events,
        }
    }

    fn emit(&self, event: ProviderEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Store serialized outline JSON as a local change
    pub fn write_json(&self, json: &str) -> Result<(), ReplicaError> {
        // Reject anything that is not JSON before it replicates.
        check_json(json)?;

        {
            let mut txn = self.doc.transact_mut();
            if self.text.get_string(&txn) == json {
                return Ok(());
            }
            let len = self.text.len(&txn);
            if len > 0 {
                self.text.remove_range(&mut txn, 0, len);
            }
            self.text.insert(&mut txn, 0, json);
        }

        if !self.local_changes.swap(true, Ordering::SeqCst) {
            self.emit(ProviderEvent::LocalChanges(true));
        }
        Ok(())
    }

    /// Store a document in its persisted form
    pub fn write_document(&self, document: &Document) -> Result<(), ReplicaError> {
        self.write_json(&document.to_persisted_json()?)
    }

    pub fn read_json(&self) -> String {
        let txn = self.doc.transact();
        self.text.get_string(&txn)
    }

    /// Load the replicated document, `None` while nothing has replicated
    pub fn load_document(
        &self,
        doc_id: &str,
        options: DocumentOptions,
    ) -> Result<Option<Document>, ReplicaError> {
        let json = self.read_json();
        if json.is_empty() {
            return Ok(None);
        }
        Ok(Some(Document::load_str(&json, doc_id, options)?))
    }

    /// Encode local changes since the last flush
    pub fn flush(&self) -> Vec<u8> {
        let mut flushed = self.flushed.lock().unwrap_or_else(PoisonError::into_inner);
        let txn = self.doc.transact();
        let update = txn.encode_state_as_update_v1(&flushed);
        *flushed = txn.state_vector();
        drop(txn);

        if self.local_changes.swap(false, Ordering::SeqCst) {
            self.emit(ProviderEvent::LocalChanges(false));
        }
        tracing::debug!(bytes = update.len(), "flushed local changes");
        update
    }

    /// Full state, for bootstrapping another replica
    pub fn encode_state(&self) -> Vec<u8> {
        let txn = self.doc.transact();
        txn.encode_state_as_update_v1(&StateVector::default())
    }

    /// Apply an update from the transport; the replica is then synced
    pub fn apply_remote(&self, update: &[u8]) -> Result<(), ReplicaError> {
        let update = Update::decode_v1(update).map_err(|e| ReplicaError::Decode(e.to_string()))?;
        {
            let mut txn = self.doc.transact_mut();
            txn.apply_update(update)
                .map_err(|e| ReplicaError::Apply(e.to_string()))?;
        }
        self.set_synced(true);
        Ok(())
    }

    pub fn set_synced(&self, synced: bool) {
        if self.synced.swap(synced, Ordering::SeqCst) != synced {
            self.emit(ProviderEvent::Sync(synced));
        }
    }

    /// Drop the connection; the replica is no longer synced
    pub fn disconnect(&self, reason: &str) {
        tracing::warn!(%reason, "replica disconnected");
        self.synced.store(false, Ordering::SeqCst);
        self.emit(ProviderEvent::ConnectionError(reason.to_string()));
    }

    /// Live readiness subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }
}

impl Default for Replica {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Replica {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Replica")
            .field("synced", &self.is_synced())
            .field("local_changes", &self.has_local_changes())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl ReplicationProvider for Replica {
    fn is_synced(&self) -> bool {
        self.synced.load(Ordering::SeqCst)
    }

    fn has_local_changes(&self) -> bool {
        self.local_changes.load(Ordering::SeqCst)
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}
