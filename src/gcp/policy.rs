//! IAM policy document
//!
//! Only `bindings` is interpreted. Everything else (etag, version,
//! auditConfigs, binding conditions) is carried through untouched so a
//! read-modify-write never drops data.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bindings: Vec<Binding>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    pub role: String,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Policy {
    /// Whether `member` holds `role` unconditionally
    pub fn has_binding(&self, role: &str, member: &str) -> bool {
        self.bindings
            .iter()
            .filter(|b| b.role == role && b.condition.is_none())
            .any(|b| b.members.iter().any(|m| m == member))
    }

    /// Add `member` to `role`. Returns false when it was already bound.
    pub fn add_binding(&mut self, role: &str, member: &str) -> bool {
        if self.has_binding(role, member) {
            return false;
        }

        match self
            .bindings
            .iter_mut()
            .find(|b| b.role == role && b.condition.is_none())
        {
            Some(binding) => binding.members.push(member.to_string()),
            None => self.bindings.push(Binding {
                role: role.to_string(),
                members: vec![member.to_string()],
                ..Default::default()
            }),
        }
        true
    }
}
