use chrono::{DateTime, Utc};
use lfo_reconcile::{ObjectKey, DEFAULT_NAMESPACE};
use serde::{Deserialize, Serialize};

use super::Kind;

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

/// Identity and bookkeeping shared by every record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,

    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Assigned by the store on creation.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uid: String,

    /// Bumped by the store whenever the spec changes.
    #[serde(default)]
    pub generation: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owner_references: Vec<OwnerReference>,
}

impl ObjectMeta {
    pub fn new(key: &ObjectKey) -> Self {
        Self {
            name: key.name.clone(),
            namespace: key.namespace.clone(),
            uid: String::new(),
            generation: 0,
            creation_timestamp: None,
            owner_references: Vec::new(),
        }
    }

    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(&self.namespace, &self.name)
    }
}

/// Points at the record that owns this one. Owned records are deleted
/// together with their owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerReference {
    pub api_version: String,
    pub kind: Kind,
    pub name: String,
    pub uid: String,
    #[serde(default)]
    pub controller: bool,
}
