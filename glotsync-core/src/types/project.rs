//! Workspace / project / namespace / language types

use serde::{Deserialize, Serialize};

/// Billing and tenancy boundary
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    /// Key entitlement from billing; `None` means unlimited
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_limit: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub workspace_id: String,
    pub name: String,
    /// Source-of-truth language for every key in the project
    pub primary_language_id: String,
    /// Free-form style instructions passed to the model
    #[serde(default)]
    pub style_rules: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Namespace {
    pub id: String,
    pub project_id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Language {
    pub id: String,
    pub project_id: String,
    /// BCP 47 tag, e.g. `fr` or `pt-BR`
    pub code: String,
    /// Display name used in prompts, e.g. `French`
    pub name: String,
    #[serde(default)]
    pub deleted: bool,
}

impl Language {
    /// `French (fr)`
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.code)
    }
}
