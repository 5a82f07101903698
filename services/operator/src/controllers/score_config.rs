use std::sync::Arc;

use async_trait::async_trait;
use lfo_langfuse::{CreateScoreConfigRequest, LangfuseApi};
use lfo_reconcile::{Controller, Lifecycle, ObjectKey, Readiness, ReconcileError};
use tracing::info;

use super::{fetch, lifecycle, mark_available, Context};
use crate::resolver::ProjectResolver;
use crate::resources::{ScoreConfig, ScoreConfigSpec};
use crate::store::Records;

pub struct ScoreConfigController {
    score_configs: Records<ScoreConfigSpec>,
    resolver: ProjectResolver,
    langfuse: Arc<dyn LangfuseApi>,
}

impl ScoreConfigController {
    pub fn new(ctx: &Context) -> Self {
        Self {
            score_configs: ctx.records(),
            resolver: ctx.resolver(),
            langfuse: Arc::clone(&ctx.langfuse),
        }
    }
}

#[async_trait]
impl Controller for ScoreConfigController {
    type Record = ScoreConfig;
    type Parent = String;
    type Created = ();

    fn kind(&self) -> &'static str {
        "LangfuseScoreConfig"
    }

    async fn fetch(&self, key: &ObjectKey) -> Result<Option<ScoreConfig>, ReconcileError> {
        fetch(&self.score_configs, key).await
    }

    fn lifecycle(&self, config: &ScoreConfig) -> Lifecycle {
        lifecycle(&config.status)
    }

    async fn resolve(
        &self,
        key: &ObjectKey,
        config: &ScoreConfig,
    ) -> Result<Readiness<String>, ReconcileError> {
        Ok(self
            .resolver
            .resolve_parent_ready(&key.namespace, &config.spec.project_ref)
            .await?)
    }

    async fn call_external(
        &self,
        config: &ScoreConfig,
        project_id: &String,
    ) -> Result<(), ReconcileError> {
        info!(
            name = %config.spec.name,
            data_type = %config.spec.data_type,
            project_id = %project_id,
            "Creating Langfuse score config"
        );

        let request = CreateScoreConfigRequest {
            name: config.spec.name.clone(),
            data_type: config.spec.data_type.clone(),
            min_value: config.spec.min_value,
            max_value: config.spec.max_value,
            categories: config.spec.categories.clone(),
        };

        self.langfuse
            .create_score_config(project_id, &request)
            .await
            .map_err(ReconcileError::adapter)
    }

    async fn commit(
        &self,
        key: &ObjectKey,
        _config: ScoreConfig,
        _created: (),
    ) -> Result<(), ReconcileError> {
        mark_available(&self.score_configs, key, "Score Config created").await
    }
}
