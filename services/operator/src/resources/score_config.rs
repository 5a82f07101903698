use serde::{Deserialize, Serialize};

use super::{Kind, Object, ResourceStatus, Spec};

pub type ScoreConfig = Object<ScoreConfigSpec>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreConfigSpec {
    pub project_ref: String,
    pub name: String,

    /// `NUMERIC`, `CATEGORICAL` or `BOOLEAN`.
    pub data_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<i64>,

    /// Allowed values for `CATEGORICAL`; unset is sent as `null`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
}

impl Spec for ScoreConfigSpec {
    const KIND: Kind = Kind::ScoreConfig;
    type Status = ResourceStatus;

    fn project_ref(&self) -> Option<&str> {
        Some(&self.project_ref)
    }
}
