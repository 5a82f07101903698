//! Dependency resolution for project children.

use lfo_reconcile::{ObjectKey, Readiness, ReconcileError};
use thiserror::Error;

use crate::resources::ProjectSpec;
use crate::store::{Records, StoreError};

/// Why a parent project could not be resolved.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The referenced project record does not exist.
    #[error("project {0} not found")]
    NotFound(ObjectKey),

    /// The referenced project record could not be read.
    #[error("failed to read project {key}: {source}")]
    Store {
        key: ObjectKey,
        #[source]
        source: StoreError,
    },
}

impl From<ResolveError> for ReconcileError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::NotFound(parent) => ReconcileError::DependencyMissing { parent },
            ResolveError::Store { key, source } => ReconcileError::DependencyFetch {
                parent: key,
                source: Box::new(source),
            },
        }
    }
}

/// Reads a referenced project and reports whether children may proceed.
#[derive(Clone)]
pub struct ProjectResolver {
    projects: Records<ProjectSpec>,
}

impl ProjectResolver {
    pub fn new(projects: Records<ProjectSpec>) -> Self {
        Self { projects }
    }

    /// Resolve `project_ref` in `namespace`.
    ///
    /// Ready carries the project's external id. A project without one is
    /// `Unready`; a project that cannot be read at all is an error.
    pub async fn resolve_parent_ready(
        &self,
        namespace: &str,
        project_ref: &str,
    ) -> Result<Readiness<String>, ResolveError> {
        let key = ObjectKey::new(namespace, project_ref);

        let project = self
            .projects
            .get(&key)
            .await
            .map_err(|source| ResolveError::Store {
                key: key.clone(),
                source,
            })?
            .ok_or_else(|| ResolveError::NotFound(key.clone()))?;

        match project.status.external_id() {
            Some(id) => Ok(Readiness::Ready(id.to_string())),
            None => Ok(Readiness::Unready { parent: key }),
        }
    }
}
