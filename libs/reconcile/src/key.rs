//! Namespaced record identity.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Namespace used when a record does not name one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Identifies a record by namespace and name.
///
/// This is the unit the work queue de-duplicates on: at most one
/// reconciliation per key is in flight at any time.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    /// Create a key from a namespace and name.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// A key for another record in the same namespace.
    ///
    /// Cross-record references (`projectRef`) are always namespace-local.
    pub fn sibling(&self, name: impl Into<String>) -> Self {
        Self {
            namespace: self.namespace.clone(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}
