//! Declarative record types.
//!
//! Every record is a JSON document of the shape
//! `{apiVersion, kind, metadata, spec, status}`. The five Langfuse kinds are
//! reconciled; `Secret` is the credential object an API key materializes.

mod api_key;
mod meta;
mod model;
mod project;
mod prompt;
mod score_config;
mod secret;

use std::fmt;
use std::str::FromStr;

use lfo_reconcile::{Condition, ObjectKey};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub use api_key::{ApiKey, ApiKeySpec};
pub use meta::{ObjectMeta, OwnerReference};
pub use model::{Model, ModelSpec};
pub use project::{Project, ProjectSpec, ProjectState, ProjectStatus};
pub use prompt::{Prompt, PromptSpec};
pub use score_config::{ScoreConfig, ScoreConfigSpec};
pub use secret::{
    Secret, SecretSpec, SecretStatus, LANGFUSE_HOST_KEY, LANGFUSE_PUBLIC_KEY_KEY,
    LANGFUSE_SECRET_KEY_KEY,
};

/// API group/version of the Langfuse kinds.
pub const LANGFUSE_API_VERSION: &str = "langfuse.io/v1alpha1";

/// Record kinds known to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Kind {
    #[serde(rename = "LangfuseProject")]
    Project,
    #[serde(rename = "LangfuseAPIKey")]
    ApiKey,
    #[serde(rename = "LangfuseModel")]
    Model,
    #[serde(rename = "LangfusePrompt")]
    Prompt,
    #[serde(rename = "LangfuseScoreConfig")]
    ScoreConfig,
    Secret,
}

impl Kind {
    /// Kinds with a controller.
    pub const RECONCILED: [Kind; 5] = [
        Kind::Project,
        Kind::ApiKey,
        Kind::Model,
        Kind::Prompt,
        Kind::ScoreConfig,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "LangfuseProject",
            Self::ApiKey => "LangfuseAPIKey",
            Self::Model => "LangfuseModel",
            Self::Prompt => "LangfusePrompt",
            Self::ScoreConfig => "LangfuseScoreConfig",
            Self::Secret => "Secret",
        }
    }

    pub fn api_version(&self) -> &'static str {
        match self {
            Self::Secret => "v1",
            _ => LANGFUSE_API_VERSION,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown kind name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown kind: {0}")]
pub struct UnknownKind(pub String);

impl FromStr for Kind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LangfuseProject" => Ok(Self::Project),
            "LangfuseAPIKey" => Ok(Self::ApiKey),
            "LangfuseModel" => Ok(Self::Model),
            "LangfusePrompt" => Ok(Self::Prompt),
            "LangfuseScoreConfig" => Ok(Self::ScoreConfig),
            "Secret" => Ok(Self::Secret),
            other => Err(UnknownKind(other.to_string())),
        }
    }
}

/// Desired-state section of a kind; ties it to its kind and status type.
pub trait Spec:
    Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    const KIND: Kind;

    /// Observed-state section.
    type Status: Clone
        + fmt::Debug
        + Default
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static;

    /// Name of the project this record belongs to, for child kinds.
    fn project_ref(&self) -> Option<&str> {
        None
    }
}

/// A stored record: metadata plus desired and observed state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound = "")]
pub struct Object<S: Spec> {
    pub api_version: String,
    pub kind: Kind,
    pub metadata: ObjectMeta,
    pub spec: S,
    #[serde(default)]
    pub status: S::Status,
}

impl<S: Spec> Object<S> {
    /// A new record with empty status.
    pub fn new(key: &ObjectKey, spec: S) -> Self {
        Self {
            api_version: S::KIND.api_version().to_string(),
            kind: S::KIND,
            metadata: ObjectMeta::new(key),
            spec,
            status: S::Status::default(),
        }
    }

    pub fn key(&self) -> ObjectKey {
        self.metadata.key()
    }

    /// Reference making this record the controlling owner of another.
    pub fn controller_reference(&self) -> OwnerReference {
        OwnerReference {
            api_version: self.api_version.clone(),
            kind: self.kind,
            name: self.metadata.name.clone(),
            uid: self.metadata.uid.clone(),
            controller: true,
        }
    }
}

/// Status of kinds whose only observed state is their conditions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_round_trip() {
        for kind in Kind::RECONCILED.into_iter().chain([Kind::Secret]) {
            assert_eq!(kind.as_str().parse::<Kind>(), Ok(kind));
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, kind.as_str());
        }
        assert!("Deployment".parse::<Kind>().is_err());
    }

    #[test]
    fn test_object_document_shape() {
        let key = ObjectKey::new("team-a", "proj-a");
        let project = Project::new(
            &key,
            ProjectSpec {
                name: "Project A".to_string(),
            },
        );

        let json = serde_json::to_value(&project).unwrap();
        assert_eq!(json["apiVersion"], LANGFUSE_API_VERSION);
        assert_eq!(json["kind"], "LangfuseProject");
        assert_eq!(json["metadata"]["name"], "proj-a");
        assert_eq!(json["metadata"]["namespace"], "team-a");
        assert_eq!(json["spec"]["name"], "Project A");

        let back: Project = serde_json::from_value(json).unwrap();
        assert_eq!(back.key(), key);
        assert_eq!(back.spec, project.spec);
    }

    #[test]
    fn test_missing_status_defaults() {
        let json = serde_json::json!({
            "apiVersion": LANGFUSE_API_VERSION,
            "kind": "LangfusePrompt",
            "metadata": {"name": "greeting"},
            "spec": {"projectRef": "proj-a", "name": "greeting", "prompt": "Hi", "type": "text"}
        });

        let prompt: Prompt = serde_json::from_value(json).unwrap();
        assert!(prompt.status.conditions.is_empty());
        assert_eq!(prompt.metadata.namespace, "default");
        assert_eq!(prompt.spec.project_ref(), Some("proj-a"));
    }
}
