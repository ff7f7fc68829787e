//! Usage counter types

use serde::{Deserialize, Serialize};

/// Counter scope; every key counts once at each level
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "scope", content = "id", rename_all = "lowercase")]
pub enum UsageScope {
    Workspace(String),
    Project(String),
    Namespace(String),
}

impl UsageScope {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Workspace(_) => "workspace",
            Self::Project(_) => "project",
            Self::Namespace(_) => "namespace",
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Workspace(id) | Self::Project(id) | Self::Namespace(id) => id,
        }
    }

    /// The three scopes a key in `namespace_id` counts toward.
    pub fn for_key(workspace_id: &str, project_id: &str, namespace_id: &str) -> [Self; 3] {
        [
            Self::Workspace(workspace_id.to_string()),
            Self::Project(project_id.to_string()),
            Self::Namespace(namespace_id.to_string()),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UsageCounter {
    pub scope: UsageScope,
    pub translation_keys: u64,
}
