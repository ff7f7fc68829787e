//! Structural change patch

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AddEntry {
    pub path: String,
    pub new_value: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModifyEntry {
    pub path: String,
    pub old_value: Value,
    pub new_value: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeleteEntry {
    pub path: String,
    pub old_value: Value,
}

/// Leaf-level difference between two nested content trees, keyed by dotted path
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChangePatch {
    #[serde(default)]
    pub add: Vec<AddEntry>,
    #[serde(default)]
    pub modify: Vec<ModifyEntry>,
    #[serde(default)]
    pub delete: Vec<DeleteEntry>,
}

impl ChangePatch {
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.modify.is_empty() && self.delete.is_empty()
    }

    pub fn len(&self) -> usize {
        self.add.len() + self.modify.len() + self.delete.len()
    }
}
