//! Reconciliation error taxonomy.

use thiserror::Error;

use crate::key::ObjectKey;

/// Boxed error from a collaborator (store, adapter).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by a reconciliation.
///
/// Every variant is retried by the scheduler with backoff. A record that
/// vanished is not an error at all (the driver returns `Action::Done`), and
/// an unready parent is `Action::Requeue`.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The referenced parent record does not exist.
    #[error("dependency {parent} not found")]
    DependencyMissing { parent: ObjectKey },

    /// The referenced parent record could not be read.
    #[error("failed to read dependency {parent}: {source}")]
    DependencyFetch {
        parent: ObjectKey,
        #[source]
        source: BoxError,
    },

    /// The external system rejected the call or could not be reached.
    #[error("external call failed: {0}")]
    Adapter(#[source] BoxError),

    /// A status or side-effect write failed.
    #[error("failed to persist {what}: {source}")]
    Persistence {
        what: &'static str,
        #[source]
        source: BoxError,
    },

    /// The record itself could not be read.
    #[error("store error: {0}")]
    Store(#[source] BoxError),
}

impl ReconcileError {
    pub fn adapter(err: impl Into<BoxError>) -> Self {
        Self::Adapter(err.into())
    }

    pub fn persistence(what: &'static str, err: impl Into<BoxError>) -> Self {
        Self::Persistence {
            what,
            source: err.into(),
        }
    }

    pub fn store(err: impl Into<BoxError>) -> Self {
        Self::Store(err.into())
    }

    /// Short label for logs.
    pub fn category(&self) -> &'static str {
        match self {
            Self::DependencyMissing { .. } => "dependency_missing",
            Self::DependencyFetch { .. } => "dependency_fetch",
            Self::Adapter(_) => "adapter",
            Self::Persistence { .. } => "persistence",
            Self::Store(_) => "store",
        }
    }
}
