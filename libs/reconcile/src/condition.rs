//! Status conditions and the per-record lifecycle derived from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Condition type marking a record whose external side effect has happened.
pub const AVAILABLE: &str = "Available";

/// Reason written alongside a successful creation.
pub const REASON_CREATED: &str = "Created";

/// Tri-state condition status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    #[default]
    Unknown,
}

/// A typed, timestamped observation attached to a record's status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: ConditionStatus,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
    pub last_transition_time: DateTime<Utc>,
}

impl Condition {
    /// The single condition committed after a successful creation.
    pub fn available(message: impl Into<String>) -> Self {
        Self {
            type_: AVAILABLE.to_string(),
            status: ConditionStatus::True,
            reason: REASON_CREATED.to_string(),
            message: message.into(),
            last_transition_time: Utc::now(),
        }
    }

    /// Returns true if this is a truthy `Available` condition.
    pub fn is_available(&self) -> bool {
        self.type_ == AVAILABLE && self.status == ConditionStatus::True
    }
}

/// Returns true if any condition is a truthy `Available`.
pub fn is_available(conditions: &[Condition]) -> bool {
    conditions.iter().any(Condition::is_available)
}

/// Where a record sits in its reconciliation lifecycle.
///
/// ```text
/// Unreconciled --(parent not ready)--> Waiting
/// Unreconciled | Waiting --(call + commit succeed)--> Synced
/// Unreconciled | Waiting --(any failure)--> Failed --(retry)--> Unreconciled
/// ```
///
/// `Synced` is the only terminal state. There is no terminal failure:
/// a failed record is handed back to the queue and retried with backoff
/// for as long as the process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// No successful reconciliation recorded yet.
    Unreconciled,

    /// Waiting for a parent record to become ready.
    Waiting,

    /// External side effect done and committed to status.
    Synced,

    /// Last attempt failed; will be retried.
    Failed,
}

impl Lifecycle {
    /// Read the entry state from persisted conditions.
    ///
    /// Only `Synced` and `Unreconciled` are observable from status;
    /// `Waiting` and `Failed` are never persisted.
    pub fn from_conditions(conditions: &[Condition]) -> Self {
        if is_available(conditions) {
            Self::Synced
        } else {
            Self::Unreconciled
        }
    }

    /// Returns true if no further reconciliation is needed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Synced)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unreconciled => "unreconciled",
            Self::Waiting => "waiting",
            Self::Synced => "synced",
            Self::Failed => "failed",
        }
    }
}
