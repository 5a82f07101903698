use serde::{Deserialize, Serialize};

use super::{Kind, Object, ResourceStatus, Spec};

/// A model pricing definition. Global to the Langfuse instance.
pub type Model = Object<ModelSpec>;

/// Prices are decimal strings and are only parsed when calling Langfuse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSpec {
    pub model_name: String,
    pub match_pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokenizer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokenizer_config: Option<String>,
}

impl Spec for ModelSpec {
    const KIND: Kind = Kind::Model;
    type Status = ResourceStatus;
}
