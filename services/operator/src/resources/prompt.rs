use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Kind, Object, ResourceStatus, Spec};

pub type Prompt = Object<PromptSpec>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptSpec {
    pub project_ref: String,
    pub name: String,

    /// Prompt body.
    pub prompt: String,

    /// `text` or `chat`.
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
}

impl Spec for PromptSpec {
    const KIND: Kind = Kind::Prompt;
    type Status = ResourceStatus;

    fn project_ref(&self) -> Option<&str> {
        Some(&self.project_ref)
    }
}
