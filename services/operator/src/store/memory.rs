//! In-memory record store.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use lfo_reconcile::ObjectKey;
use serde_json::{json, Value};
use tokio::sync::{broadcast, RwLock};
use tracing::debug;
use uuid::Uuid;

use super::{document_key, Change, Document, RecordStore, StoreError, StoreEvent};
use crate::resources::Kind;

/// Notifications buffered per subscriber before it is reported as lagged.
const EVENT_CAPACITY: usize = 1024;

#[derive(Default)]
struct State {
    records: BTreeMap<(Kind, ObjectKey), Document>,
    failing_reads: HashSet<Kind>,
    failing_writes: HashSet<Kind>,
}

impl State {
    fn check_read(&self, kind: Kind) -> Result<(), StoreError> {
        if self.failing_reads.contains(&kind) {
            return Err(StoreError::Unavailable(format!("reads of {kind} are failing")));
        }
        Ok(())
    }

    fn check_write(&self, kind: Kind) -> Result<(), StoreError> {
        if self.failing_writes.contains(&kind) {
            return Err(StoreError::Unavailable(format!("writes of {kind} are failing")));
        }
        Ok(())
    }
}

/// Process-local [`RecordStore`].
///
/// Assigns `uid`, `generation` and `creationTimestamp` on create, bumps
/// `generation` on spec changes, and cascades deletes through owner
/// references. Writes that change nothing emit no event.
pub struct MemoryStore {
    state: RwLock<State>,
    events: broadcast::Sender<StoreEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: RwLock::new(State::default()),
            events,
        }
    }

    /// Make reads of `kind` fail with `Unavailable`.
    pub async fn fail_reads(&self, kind: Kind) {
        self.state.write().await.failing_reads.insert(kind);
    }

    /// Make writes of `kind` fail with `Unavailable`.
    pub async fn fail_writes(&self, kind: Kind) {
        self.state.write().await.failing_writes.insert(kind);
    }

    /// Clear all injected failures.
    pub async fn heal(&self) {
        let mut state = self.state.write().await;
        state.failing_reads.clear();
        state.failing_writes.clear();
    }

    /// Number of stored records of a kind.
    pub async fn count(&self, kind: Kind) -> usize {
        self.state
            .read()
            .await
            .records
            .keys()
            .filter(|(k, _)| *k == kind)
            .count()
    }

    fn emit(&self, kind: Kind, key: &ObjectKey, change: Change) {
        debug!(kind = %kind, key = %key, ?change, "Store event");
        // No subscribers is fine.
        let _ = self.events.send(StoreEvent {
            kind,
            key: key.clone(),
            change,
        });
    }

    fn insert_new(
        &self,
        state: &mut State,
        kind: Kind,
        key: ObjectKey,
        mut document: Document,
    ) -> Result<Document, StoreError> {
        let object = document
            .as_object_mut()
            .ok_or_else(|| StoreError::Invalid {
                kind,
                reason: "document is not an object".to_string(),
            })?;

        object.insert("apiVersion".to_string(), json!(kind.api_version()));
        object.insert("kind".to_string(), json!(kind.as_str()));
        if object.get("status").map_or(true, Value::is_null) {
            object.insert("status".to_string(), json!({}));
        }

        let metadata = object
            .get_mut("metadata")
            .and_then(Value::as_object_mut)
            .ok_or_else(|| StoreError::Invalid {
                kind,
                reason: "metadata is not an object".to_string(),
            })?;
        metadata.insert("namespace".to_string(), json!(key.namespace));
        metadata.insert("uid".to_string(), json!(Uuid::new_v4().to_string()));
        metadata.insert("generation".to_string(), json!(1));
        metadata.insert("creationTimestamp".to_string(), serde_json::to_value(Utc::now())?);

        state.records.insert((kind, key.clone()), document.clone());
        self.emit(kind, &key, Change::Created);
        Ok(document)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn uid_of(document: &Document) -> Option<&str> {
    document.pointer("/metadata/uid").and_then(Value::as_str)
}

fn is_owned_by(document: &Document, owner_uid: &str) -> bool {
    document
        .pointer("/metadata/ownerReferences")
        .and_then(Value::as_array)
        .is_some_and(|refs| {
            refs.iter()
                .any(|r| r.get("uid").and_then(Value::as_str) == Some(owner_uid))
        })
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get(&self, kind: Kind, key: &ObjectKey) -> Result<Option<Document>, StoreError> {
        let state = self.state.read().await;
        state.check_read(kind)?;
        Ok(state.records.get(&(kind, key.clone())).cloned())
    }

    async fn create(&self, kind: Kind, document: Document) -> Result<Document, StoreError> {
        let key = document_key(kind, &document)?;
        let mut state = self.state.write().await;
        state.check_write(kind)?;

        if state.records.contains_key(&(kind, key.clone())) {
            return Err(StoreError::AlreadyExists { kind, key });
        }

        self.insert_new(&mut state, kind, key, document)
    }

    async fn apply_spec(&self, kind: Kind, document: Document) -> Result<Document, StoreError> {
        let key = document_key(kind, &document)?;
        let mut state = self.state.write().await;
        state.check_write(kind)?;

        let Some(existing) = state.records.get_mut(&(kind, key.clone())) else {
            return self.insert_new(&mut state, kind, key, document);
        };

        let spec = document.get("spec").cloned().unwrap_or(Value::Null);
        if existing.get("spec") == Some(&spec) {
            return Ok(existing.clone());
        }

        let generation = existing
            .pointer("/metadata/generation")
            .and_then(Value::as_i64)
            .unwrap_or(0);
        existing["spec"] = spec;
        existing["metadata"]["generation"] = json!(generation + 1);

        let updated = existing.clone();
        self.emit(kind, &key, Change::SpecChanged);
        Ok(updated)
    }

    async fn patch_status(
        &self,
        kind: Kind,
        key: &ObjectKey,
        status: Value,
    ) -> Result<Document, StoreError> {
        let mut state = self.state.write().await;
        state.check_write(kind)?;

        let existing = state
            .records
            .get_mut(&(kind, key.clone()))
            .ok_or_else(|| StoreError::NotFound {
                kind,
                key: key.clone(),
            })?;

        if existing.get("status") == Some(&status) {
            return Ok(existing.clone());
        }

        existing["status"] = status;
        let updated = existing.clone();
        self.emit(kind, key, Change::StatusChanged);
        Ok(updated)
    }

    async fn list(&self, kind: Kind, namespace: Option<&str>) -> Result<Vec<Document>, StoreError> {
        let state = self.state.read().await;
        state.check_read(kind)?;

        Ok(state
            .records
            .iter()
            .filter(|((k, key), _)| {
                *k == kind && namespace.map_or(true, |ns| key.namespace == ns)
            })
            .map(|(_, doc)| doc.clone())
            .collect())
    }

    async fn delete(&self, kind: Kind, key: &ObjectKey) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        state.check_write(kind)?;

        let Some(removed) = state.records.remove(&(kind, key.clone())) else {
            return Ok(false);
        };
        self.emit(kind, key, Change::Deleted);

        // Cascade through owner references.
        let mut owners: Vec<String> = uid_of(&removed).map(str::to_string).into_iter().collect();
        while let Some(owner_uid) = owners.pop() {
            let owned: Vec<(Kind, ObjectKey)> = state
                .records
                .iter()
                .filter(|(_, doc)| is_owned_by(doc, &owner_uid))
                .map(|(id, _)| id.clone())
                .collect();

            for (owned_kind, owned_key) in owned {
                if let Some(doc) = state.records.remove(&(owned_kind, owned_key.clone())) {
                    debug!(kind = %owned_kind, key = %owned_key, owner_uid = %owner_uid, "Deleting owned record");
                    owners.extend(uid_of(&doc).map(str::to_string));
                    self.emit(owned_kind, &owned_key, Change::Deleted);
                }
            }
        }

        Ok(true)
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }
}
