//! Langfuse public API adapter.
//!
//! Exposes the five create operations the operator performs, behind the
//! [`LangfuseApi`] trait so reconcilers can run against [`MockLangfuse`]
//! in tests.

pub mod client;
pub mod error;
pub mod mock;
pub mod types;

pub use client::{LangfuseApi, LangfuseClient, LangfuseConfig, DEFAULT_BASE_URL};
pub use error::LangfuseError;
pub use mock::{Call, MockLangfuse};
pub use types::{
    ApiKey, CreateApiKeyRequest, CreateProjectRequest, CreatePromptRequest,
    CreateScoreConfigRequest, Model, Project,
};
