use lfo_reconcile::Condition;
use serde::{Deserialize, Serialize};

use super::{Kind, Object, Spec};

/// A Langfuse project. Root of the dependency graph.
pub type Project = Object<ProjectSpec>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSpec {
    /// Display name of the project in Langfuse.
    pub name: String,
}

impl Spec for ProjectSpec {
    const KIND: Kind = Kind::Project;
    type Status = ProjectStatus;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectState {
    #[default]
    Unset,
    Ready,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectStatus {
    /// External project id. Immutable once set; children wait on it.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    #[serde(default)]
    pub state: ProjectState,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl ProjectStatus {
    /// The external id, if the project has been created.
    pub fn external_id(&self) -> Option<&str> {
        Some(self.id.as_str()).filter(|id| !id.is_empty())
    }
}
