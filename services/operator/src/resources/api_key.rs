use serde::{Deserialize, Serialize};

use super::{Kind, Object, ResourceStatus, Spec};

/// An API key issued for a project, materialized into a [`super::Secret`].
pub type ApiKey = Object<ApiKeySpec>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeySpec {
    pub project_ref: String,
    pub name: String,

    /// Name of the credential secret to create. Defaults to the record name.
    #[serde(default)]
    pub secret_name: String,
}

impl Spec for ApiKeySpec {
    const KIND: Kind = Kind::ApiKey;
    type Status = ResourceStatus;

    fn project_ref(&self) -> Option<&str> {
        Some(&self.project_ref)
    }
}
