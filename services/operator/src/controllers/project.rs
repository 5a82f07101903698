use std::sync::Arc;

use async_trait::async_trait;
use lfo_langfuse::LangfuseApi;
use lfo_reconcile::{Condition, Controller, Lifecycle, ObjectKey, Readiness, ReconcileError};
use tracing::{error, info};

use super::{fetch, Context};
use crate::resources::{Project, ProjectSpec, ProjectState, ProjectStatus};
use crate::store::Records;

/// Creates Langfuse projects. Root kind: no dependency.
pub struct ProjectController {
    projects: Records<ProjectSpec>,
    langfuse: Arc<dyn LangfuseApi>,
}

impl ProjectController {
    pub fn new(ctx: &Context) -> Self {
        Self {
            projects: ctx.records(),
            langfuse: Arc::clone(&ctx.langfuse),
        }
    }
}

#[async_trait]
impl Controller for ProjectController {
    type Record = Project;
    type Parent = ();
    type Created = lfo_langfuse::Project;

    fn kind(&self) -> &'static str {
        "LangfuseProject"
    }

    async fn fetch(&self, key: &ObjectKey) -> Result<Option<Project>, ReconcileError> {
        fetch(&self.projects, key).await
    }

    /// A project with an external id is synced for good; it is never
    /// re-verified against Langfuse.
    fn lifecycle(&self, project: &Project) -> Lifecycle {
        if project.status.external_id().is_some() {
            Lifecycle::Synced
        } else {
            Lifecycle::from_conditions(&project.status.conditions)
        }
    }

    async fn resolve(
        &self,
        _key: &ObjectKey,
        _project: &Project,
    ) -> Result<Readiness<()>, ReconcileError> {
        Ok(Readiness::Ready(()))
    }

    async fn call_external(
        &self,
        project: &Project,
        _parent: &(),
    ) -> Result<lfo_langfuse::Project, ReconcileError> {
        info!(name = %project.spec.name, "Creating Langfuse project");

        let created = self
            .langfuse
            .create_project(&project.spec.name)
            .await
            .map_err(ReconcileError::adapter)?;

        // Persisting an empty id would leave every child waiting forever.
        if created.id.is_empty() {
            return Err(ReconcileError::adapter(
                "Langfuse returned a project without an id",
            ));
        }

        Ok(created)
    }

    async fn commit(
        &self,
        key: &ObjectKey,
        _project: Project,
        created: lfo_langfuse::Project,
    ) -> Result<(), ReconcileError> {
        let status = ProjectStatus {
            id: created.id,
            state: ProjectState::Ready,
            conditions: vec![Condition::available("Project created")],
        };

        self.projects
            .patch_status(key, &status)
            .await
            .map_err(|e| ReconcileError::persistence("project status", e))?;

        info!(project_id = %status.id, "Project ready");
        Ok(())
    }

    async fn record_failure(
        &self,
        key: &ObjectKey,
        project: Project,
        _error: &ReconcileError,
    ) -> Result<(), ReconcileError> {
        let status = ProjectStatus {
            state: ProjectState::Error,
            ..project.status
        };

        self.projects
            .patch_status(key, &status)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to record project error state");
                ReconcileError::persistence("project status", e)
            })?;
        Ok(())
    }
}
