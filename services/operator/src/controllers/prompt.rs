use std::sync::Arc;

use async_trait::async_trait;
use lfo_langfuse::{CreatePromptRequest, LangfuseApi};
use lfo_reconcile::{Controller, Lifecycle, ObjectKey, Readiness, ReconcileError};
use tracing::info;

use super::{fetch, lifecycle, mark_available, Context};
use crate::resolver::ProjectResolver;
use crate::resources::{Prompt, PromptSpec};
use crate::store::Records;

pub struct PromptController {
    prompts: Records<PromptSpec>,
    resolver: ProjectResolver,
    langfuse: Arc<dyn LangfuseApi>,
}

impl PromptController {
    pub fn new(ctx: &Context) -> Self {
        Self {
            prompts: ctx.records(),
            resolver: ctx.resolver(),
            langfuse: Arc::clone(&ctx.langfuse),
        }
    }
}

#[async_trait]
impl Controller for PromptController {
    type Record = Prompt;
    type Parent = String;
    type Created = ();

    fn kind(&self) -> &'static str {
        "LangfusePrompt"
    }

    async fn fetch(&self, key: &ObjectKey) -> Result<Option<Prompt>, ReconcileError> {
        fetch(&self.prompts, key).await
    }

    fn lifecycle(&self, prompt: &Prompt) -> Lifecycle {
        lifecycle(&prompt.status)
    }

    async fn resolve(
        &self,
        key: &ObjectKey,
        prompt: &Prompt,
    ) -> Result<Readiness<String>, ReconcileError> {
        Ok(self
            .resolver
            .resolve_parent_ready(&key.namespace, &prompt.spec.project_ref)
            .await?)
    }

    async fn call_external(
        &self,
        prompt: &Prompt,
        project_id: &String,
    ) -> Result<(), ReconcileError> {
        info!(name = %prompt.spec.name, project_id = %project_id, "Creating Langfuse prompt");

        let request = CreatePromptRequest {
            name: prompt.spec.name.clone(),
            prompt: prompt.spec.prompt.clone(),
            kind: prompt.spec.kind.clone(),
            config: prompt.spec.config.clone(),
            labels: prompt.spec.labels.clone(),
        };

        self.langfuse
            .create_prompt(project_id, &request)
            .await
            .map_err(ReconcileError::adapter)
    }

    async fn commit(
        &self,
        key: &ObjectKey,
        _prompt: Prompt,
        _created: (),
    ) -> Result<(), ReconcileError> {
        mark_available(&self.prompts, key, "Prompt created").await
    }
}
