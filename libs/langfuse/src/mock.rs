//! In-process stand-in for the Langfuse API.
//!
//! Records every call so tests and dry runs can assert exactly what would
//! have been sent.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::info;

use crate::client::LangfuseApi;
use crate::error::LangfuseError;
use crate::types::{ApiKey, CreatePromptRequest, CreateScoreConfigRequest, Model, Project};

/// A call received by [`MockLangfuse`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateProject { name: String },
    CreateApiKey { project_id: String, name: String },
    CreateModel(Model),
    CreatePrompt { project_id: String, request: CreatePromptRequest },
    CreateScoreConfig { project_id: String, request: CreateScoreConfigRequest },
}

#[derive(Debug, Clone)]
struct Failure {
    status: String,
    body: String,
}

/// Mock Langfuse API.
pub struct MockLangfuse {
    base_url: String,
    calls: Mutex<Vec<Call>>,
    counter: AtomicU64,
    project_ids: Mutex<HashMap<String, String>>,
    failure: Mutex<Option<Failure>>,
}

impl MockLangfuse {
    pub fn new() -> Self {
        Self {
            base_url: "https://langfuse.mock".to_string(),
            calls: Mutex::new(Vec::new()),
            counter: AtomicU64::new(0),
            project_ids: Mutex::new(HashMap::new()),
            failure: Mutex::new(None),
        }
    }

    /// Create a mock that rejects every call with the given status.
    pub fn failing(status: &str, body: &str) -> Self {
        let mock = Self::new();
        mock.fail_with(status, body);
        mock
    }

    /// Reject subsequent calls with the given status and body.
    pub fn fail_with(&self, status: &str, body: &str) {
        *lock(&self.failure) = Some(Failure {
            status: status.to_string(),
            body: body.to_string(),
        });
    }

    /// Accept calls again.
    pub fn recover(&self) {
        *lock(&self.failure) = None;
    }

    /// Fix the id returned when a project with `name` is created.
    pub fn set_project_id(&self, name: &str, id: &str) {
        lock(&self.project_ids).insert(name.to_string(), id.to_string());
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    fn record(&self, call: Call) -> Result<(), LangfuseError> {
        lock(&self.calls).push(call);
        match lock(&self.failure).clone() {
            Some(f) => Err(LangfuseError::Api {
                status: f.status,
                body: f.body,
            }),
            None => Ok(()),
        }
    }

    fn next_serial(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl Default for MockLangfuse {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl LangfuseApi for MockLangfuse {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn create_project(&self, name: &str) -> Result<Project, LangfuseError> {
        self.record(Call::CreateProject {
            name: name.to_string(),
        })?;

        let id = lock(&self.project_ids)
            .get(name)
            .cloned()
            .unwrap_or_else(|| format!("prj_{:04}", self.next_serial()));
        info!(name, id = %id, "[MOCK] Creating project");

        Ok(Project {
            id,
            name: name.to_string(),
        })
    }

    async fn create_api_key(
        &self,
        project_id: &str,
        name: &str,
    ) -> Result<ApiKey, LangfuseError> {
        self.record(Call::CreateApiKey {
            project_id: project_id.to_string(),
            name: name.to_string(),
        })?;

        let serial = self.next_serial();
        info!(project_id, name, "[MOCK] Creating API key");

        Ok(ApiKey {
            id: format!("ak_{serial:04}"),
            public_key: format!("pk-lf-{serial:04}"),
            secret_key: format!("sk-lf-{serial:04}"),
            name: name.to_string(),
            project_id: project_id.to_string(),
        })
    }

    async fn create_model(&self, model: &Model) -> Result<Model, LangfuseError> {
        self.record(Call::CreateModel(model.clone()))?;
        info!(model_name = %model.model_name, "[MOCK] Creating model");

        Ok(Model {
            id: Some(format!("mdl_{:04}", self.next_serial())),
            ..model.clone()
        })
    }

    async fn create_prompt(
        &self,
        project_id: &str,
        prompt: &CreatePromptRequest,
    ) -> Result<(), LangfuseError> {
        self.record(Call::CreatePrompt {
            project_id: project_id.to_string(),
            request: prompt.clone(),
        })?;
        info!(project_id, name = %prompt.name, "[MOCK] Creating prompt");
        Ok(())
    }

    async fn create_score_config(
        &self,
        project_id: &str,
        config: &CreateScoreConfigRequest,
    ) -> Result<(), LangfuseError> {
        self.record(Call::CreateScoreConfig {
            project_id: project_id.to_string(),
            request: config.clone(),
        })?;
        info!(project_id, name = %config.name, "[MOCK] Creating score config");
        Ok(())
    }
}
