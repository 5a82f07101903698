use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Kind, Object, Spec};

pub const LANGFUSE_PUBLIC_KEY_KEY: &str = "LANGFUSE_PUBLIC_KEY";
pub const LANGFUSE_SECRET_KEY_KEY: &str = "LANGFUSE_SECRET_KEY";
pub const LANGFUSE_HOST_KEY: &str = "LANGFUSE_HOST";

/// Credential object holding issued key material.
pub type Secret = Object<SecretSpec>;

#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretSpec {
    #[serde(default)]
    pub string_data: BTreeMap<String, String>,
}

// Values stay out of logs.
impl std::fmt::Debug for SecretSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretSpec")
            .field("keys", &self.string_data.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Secrets carry no observed state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretStatus {}

impl Spec for SecretSpec {
    const KIND: Kind = Kind::Secret;
    type Status = SecretStatus;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_values() {
        let spec = SecretSpec {
            string_data: BTreeMap::from([(
                LANGFUSE_SECRET_KEY_KEY.to_string(),
                "sk-lf-hidden".to_string(),
            )]),
        };
        let debug = format!("{spec:?}");
        assert!(debug.contains(LANGFUSE_SECRET_KEY_KEY));
        assert!(!debug.contains("sk-lf-hidden"));
    }
}
