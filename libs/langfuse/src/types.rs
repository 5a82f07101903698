//! Request and response bodies for the Langfuse public API.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A project as returned by `POST /api/public/projects`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateProjectRequest {
    pub name: String,
}

/// Issued key material from `POST /api/public/projects/{projectId}/apiKeys`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKey {
    #[serde(default)]
    pub id: String,
    pub public_key: String,
    pub secret_key: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub project_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateApiKeyRequest {
    pub name: String,
    pub project_id: String,
}

/// A model pricing definition. Sent and returned whole.
///
/// Zero prices are left off the wire, matching how the API treats an
/// absent price.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub model_name: String,
    pub match_pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    pub unit: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub input_price: f64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub output_price: f64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub total_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokenizer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokenizer_config: Option<String>,
}

fn is_zero(value: &f64) -> bool {
    *value == 0.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatePromptRequest {
    pub name: String,
    pub prompt: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub config: BTreeMap<String, String>,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateScoreConfigRequest {
    pub name: String,
    pub data_type: String,
    pub min_value: Option<i64>,
    pub max_value: Option<i64>,
    pub categories: Option<Vec<String>>,
}
