//! One [`Controller`](lfo_reconcile::Controller) per reconciled kind.
//!
//! Each controller only supplies its kind's capabilities (how to read the
//! record, what its dependency is, which Langfuse call to make and what
//! status to write). Sequencing lives in [`lfo_reconcile::reconcile`].

mod api_key;
mod model;
mod project;
mod prompt;
mod score_config;

use std::sync::Arc;

use lfo_langfuse::LangfuseApi;
use lfo_reconcile::{Condition, Lifecycle, ObjectKey, ReconcileError};

use crate::resolver::ProjectResolver;
use crate::resources::{Object, ProjectSpec, ResourceStatus, Spec};
use crate::store::{RecordStore, Records};

pub use api_key::ApiKeyController;
pub use model::{parse_price, ModelController};
pub use project::ProjectController;
pub use prompt::PromptController;
pub use score_config::ScoreConfigController;

/// Shared dependencies handed to every controller at startup.
#[derive(Clone)]
pub struct Context {
    pub store: Arc<dyn RecordStore>,
    pub langfuse: Arc<dyn LangfuseApi>,
}

impl Context {
    pub fn new(store: Arc<dyn RecordStore>, langfuse: Arc<dyn LangfuseApi>) -> Self {
        Self { store, langfuse }
    }

    pub fn records<S: Spec>(&self) -> Records<S> {
        Records::new(Arc::clone(&self.store))
    }

    pub fn resolver(&self) -> ProjectResolver {
        ProjectResolver::new(self.records::<ProjectSpec>())
    }
}

async fn fetch<S: Spec>(
    records: &Records<S>,
    key: &ObjectKey,
) -> Result<Option<Object<S>>, ReconcileError> {
    records.get(key).await.map_err(ReconcileError::store)
}

fn lifecycle(status: &ResourceStatus) -> Lifecycle {
    Lifecycle::from_conditions(&status.conditions)
}

/// Commit the single `Available` condition for a condition-only kind.
async fn mark_available<S>(
    records: &Records<S>,
    key: &ObjectKey,
    message: &str,
) -> Result<(), ReconcileError>
where
    S: Spec<Status = ResourceStatus>,
{
    let status = ResourceStatus {
        conditions: vec![Condition::available(message)],
    };
    records
        .patch_status(key, &status)
        .await
        .map_err(|e| ReconcileError::persistence("status", e))?;
    Ok(())
}
