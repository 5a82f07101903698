//! HTTP client for the Langfuse public API.
//!
//! One method per create operation the operator needs. Every request
//! carries basic-auth credentials derived from the configured key pair;
//! any status >= 400 is returned as [`LangfuseError::Api`] with the raw body.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error};

use crate::error::LangfuseError;
use crate::types::{
    ApiKey, CreateApiKeyRequest, CreateProjectRequest, CreatePromptRequest,
    CreateScoreConfigRequest, Model, Project,
};

/// Hosted endpoint used when no base address is configured.
pub const DEFAULT_BASE_URL: &str = "https://cloud.langfuse.com";

/// Immutable adapter configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct LangfuseConfig {
    /// API base address, without a trailing slash.
    pub base_url: String,

    /// Public key (basic-auth user).
    pub public_key: String,

    /// Secret key (basic-auth password).
    pub secret_key: String,

    /// Per-request timeout.
    pub timeout: Duration,
}

impl LangfuseConfig {
    pub fn new(
        base_url: impl Into<String>,
        public_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            public_key: public_key.into(),
            secret_key: secret_key.into(),
            timeout: Duration::from_secs(30),
        }
    }

    /// `Basic base64(public:secret)` header value.
    pub fn authorization(&self) -> String {
        let raw = format!("{}:{}", self.public_key, self.secret_key);
        format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode(raw)
        )
    }
}

/// The operations the reconcilers invoke against Langfuse.
#[async_trait]
pub trait LangfuseApi: Send + Sync {
    /// Base address the API is reached at.
    fn base_url(&self) -> &str;

    async fn create_project(&self, name: &str) -> Result<Project, LangfuseError>;

    async fn create_api_key(&self, project_id: &str, name: &str)
        -> Result<ApiKey, LangfuseError>;

    async fn create_model(&self, model: &Model) -> Result<Model, LangfuseError>;

    async fn create_prompt(
        &self,
        project_id: &str,
        prompt: &CreatePromptRequest,
    ) -> Result<(), LangfuseError>;

    async fn create_score_config(
        &self,
        project_id: &str,
        config: &CreateScoreConfigRequest,
    ) -> Result<(), LangfuseError>;
}

/// reqwest-backed [`LangfuseApi`].
#[derive(Debug, Clone)]
pub struct LangfuseClient {
    client: reqwest::Client,
    base_url: String,
}

impl LangfuseClient {
    pub fn new(config: &LangfuseConfig) -> Result<Self, LangfuseError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let mut authorization = HeaderValue::from_str(&config.authorization())?;
        authorization.set_sensitive(true);
        headers.insert(AUTHORIZATION, authorization);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST a JSON body and decode the JSON response.
    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, LangfuseError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let response = self.send(path, body).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// POST a JSON body, ignoring any response payload.
    async fn post_no_content<B>(&self, path: &str, body: &B) -> Result<(), LangfuseError>
    where
        B: Serialize + ?Sized + Sync,
    {
        self.send(path, body).await?;
        Ok(())
    }

    async fn send<B>(&self, path: &str, body: &B) -> Result<reqwest::Response, LangfuseError>
    where
        B: Serialize + ?Sized + Sync,
    {
        let url = self.url(path);
        debug!(url = %url, "POST");

        let response = self.client.post(&url).json(body).send().await?;

        let status = response.status();
        if status.as_u16() >= 400 {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, path, "Langfuse API error");
            return Err(LangfuseError::Api {
                status: status.to_string(),
                body,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl LangfuseApi for LangfuseClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn create_project(&self, name: &str) -> Result<Project, LangfuseError> {
        let request = CreateProjectRequest {
            name: name.to_string(),
        };
        self.post("/api/public/projects", &request).await
    }

    async fn create_api_key(
        &self,
        project_id: &str,
        name: &str,
    ) -> Result<ApiKey, LangfuseError> {
        let request = CreateApiKeyRequest {
            name: name.to_string(),
            project_id: project_id.to_string(),
        };
        self.post(&format!("/api/public/projects/{project_id}/apiKeys"), &request)
            .await
    }

    async fn create_model(&self, model: &Model) -> Result<Model, LangfuseError> {
        self.post("/api/public/models", model).await
    }

    async fn create_prompt(
        &self,
        project_id: &str,
        prompt: &CreatePromptRequest,
    ) -> Result<(), LangfuseError> {
        self.post_no_content(&format!("/api/public/projects/{project_id}/prompts"), prompt)
            .await
    }

    async fn create_score_config(
        &self,
        project_id: &str,
        config: &CreateScoreConfigRequest,
    ) -> Result<(), LangfuseError> {
        self.post_no_content(
            &format!("/api/public/projects/{project_id}/score-configs"),
            config,
        )
        .await
    }
}
