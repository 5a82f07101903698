use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use lfo_langfuse::LangfuseApi;
use lfo_reconcile::{Controller, Lifecycle, ObjectKey, Readiness, ReconcileError};
use tracing::{debug, info};

use super::{fetch, lifecycle, mark_available, Context};
use crate::resolver::ProjectResolver;
use crate::resources::{
    ApiKey, ApiKeySpec, Secret, SecretSpec, LANGFUSE_HOST_KEY, LANGFUSE_PUBLIC_KEY_KEY,
    LANGFUSE_SECRET_KEY_KEY,
};
use crate::store::Records;

/// Issues API keys and writes them to an owned credential secret.
pub struct ApiKeyController {
    api_keys: Records<ApiKeySpec>,
    secrets: Records<SecretSpec>,
    resolver: ProjectResolver,
    langfuse: Arc<dyn LangfuseApi>,
}

impl ApiKeyController {
    pub fn new(ctx: &Context) -> Self {
        Self {
            api_keys: ctx.records(),
            secrets: ctx.records(),
            resolver: ctx.resolver(),
            langfuse: Arc::clone(&ctx.langfuse),
        }
    }

    /// The credential secret for an issued key, owned by `api_key`.
    fn credential_secret(&self, api_key: &ApiKey, issued: &lfo_langfuse::ApiKey) -> Secret {
        let name = if api_key.spec.secret_name.is_empty() {
            api_key.metadata.name.clone()
        } else {
            api_key.spec.secret_name.clone()
        };

        let mut secret = Secret::new(
            &api_key.key().sibling(name),
            SecretSpec {
                string_data: BTreeMap::from([
                    (LANGFUSE_PUBLIC_KEY_KEY.to_string(), issued.public_key.clone()),
                    (LANGFUSE_SECRET_KEY_KEY.to_string(), issued.secret_key.clone()),
                    (LANGFUSE_HOST_KEY.to_string(), self.langfuse.base_url().to_string()),
                ]),
            },
        );
        secret
            .metadata
            .owner_references
            .push(api_key.controller_reference());
        secret
    }
}

#[async_trait]
impl Controller for ApiKeyController {
    type Record = ApiKey;
    type Parent = String;
    type Created = lfo_langfuse::ApiKey;

    fn kind(&self) -> &'static str {
        "LangfuseAPIKey"
    }

    async fn fetch(&self, key: &ObjectKey) -> Result<Option<ApiKey>, ReconcileError> {
        fetch(&self.api_keys, key).await
    }

    fn lifecycle(&self, api_key: &ApiKey) -> Lifecycle {
        lifecycle(&api_key.status)
    }

    async fn resolve(
        &self,
        key: &ObjectKey,
        api_key: &ApiKey,
    ) -> Result<Readiness<String>, ReconcileError> {
        Ok(self
            .resolver
            .resolve_parent_ready(&key.namespace, &api_key.spec.project_ref)
            .await?)
    }

    async fn call_external(
        &self,
        api_key: &ApiKey,
        project_id: &String,
    ) -> Result<lfo_langfuse::ApiKey, ReconcileError> {
        info!(name = %api_key.spec.name, project_id = %project_id, "Creating Langfuse API key");

        self.langfuse
            .create_api_key(project_id, &api_key.spec.name)
            .await
            .map_err(ReconcileError::adapter)
    }

    async fn materialize(
        &self,
        _key: &ObjectKey,
        api_key: &ApiKey,
        issued: &lfo_langfuse::ApiKey,
    ) -> Result<(), ReconcileError> {
        let secret = self.credential_secret(api_key, issued);
        let secret_key = secret.key();

        match self.secrets.create(&secret).await {
            Ok(_) => {
                info!(secret = %secret_key, "Credential secret created");
                Ok(())
            }
            // Left as is: the existing secret is not overwritten.
            Err(e) if e.is_already_exists() => {
                debug!(secret = %secret_key, "Credential secret already exists");
                Ok(())
            }
            Err(e) => Err(ReconcileError::persistence("credential secret", e)),
        }
    }

    async fn commit(
        &self,
        key: &ObjectKey,
        _api_key: ApiKey,
        _issued: lfo_langfuse::ApiKey,
    ) -> Result<(), ReconcileError> {
        mark_available(&self.api_keys, key, "API Key created successfully").await
    }
}
