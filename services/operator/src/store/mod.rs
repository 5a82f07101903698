//! Record store: desired and observed state for every record, plus change
//! notifications.
//!
//! Records are stored as untyped JSON documents keyed by kind and
//! namespaced name. [`Records`] layers typed access on top.

mod memory;
mod typed;

use async_trait::async_trait;
use lfo_reconcile::ObjectKey;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::resources::Kind;

pub use memory::MemoryStore;
pub use typed::Records;

/// A stored record: `{apiVersion, kind, metadata, spec, status}`.
pub type Document = Value;

/// What happened to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Created,
    SpecChanged,
    StatusChanged,
    Deleted,
}

/// Notification emitted on every effective change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEvent {
    pub kind: Kind,
    pub key: ObjectKey,
    pub change: Change,
}

/// Record store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record with this kind and key.
    #[error("{kind} {key} not found")]
    NotFound { kind: Kind, key: ObjectKey },

    /// A record with this kind and key already exists.
    #[error("{kind} {key} already exists")]
    AlreadyExists { kind: Kind, key: ObjectKey },

    /// The document does not have the expected shape.
    #[error("invalid {kind} document: {reason}")]
    Invalid { kind: Kind, reason: String },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The store cannot serve the request right now.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }
}

/// Declarative record storage with change notifications.
///
/// Writers only ever touch one section: `apply_spec` never changes
/// `status`, and `patch_status` never changes `spec`.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Get a record, `None` if absent.
    async fn get(&self, kind: Kind, key: &ObjectKey) -> Result<Option<Document>, StoreError>;

    /// Create a record. Fails with `AlreadyExists` if the key is taken.
    async fn create(&self, kind: Kind, document: Document) -> Result<Document, StoreError>;

    /// Create a record or replace its spec, leaving status untouched.
    async fn apply_spec(&self, kind: Kind, document: Document) -> Result<Document, StoreError>;

    /// Replace the status section of an existing record.
    async fn patch_status(
        &self,
        kind: Kind,
        key: &ObjectKey,
        status: Value,
    ) -> Result<Document, StoreError>;

    /// List records of a kind, optionally within one namespace.
    async fn list(&self, kind: Kind, namespace: Option<&str>) -> Result<Vec<Document>, StoreError>;

    /// Delete a record and everything it owns. Returns false if absent.
    async fn delete(&self, kind: Kind, key: &ObjectKey) -> Result<bool, StoreError>;

    /// Subscribe to change notifications.
    fn subscribe(&self) -> broadcast::Receiver<StoreEvent>;
}

/// Read the namespaced name out of a document's metadata.
pub fn document_key(kind: Kind, document: &Document) -> Result<ObjectKey, StoreError> {
    let metadata = document.get("metadata").ok_or_else(|| StoreError::Invalid {
        kind,
        reason: "missing metadata".to_string(),
    })?;

    let name = metadata
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| StoreError::Invalid {
            kind,
            reason: "missing metadata.name".to_string(),
        })?;

    let namespace = metadata
        .get("namespace")
        .and_then(Value::as_str)
        .filter(|ns| !ns.is_empty())
        .unwrap_or(lfo_reconcile::DEFAULT_NAMESPACE);

    Ok(ObjectKey::new(namespace, name))
}
