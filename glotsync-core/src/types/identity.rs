//! Verified caller identity

use serde::{Deserialize, Serialize};

/// Identity handed over by the external identity provider after verification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CallerIdentity {
    pub subject: String,
    pub organization_id: String,
}

impl CallerIdentity {
    pub fn new(subject: impl Into<String>, organization_id: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            organization_id: organization_id.into(),
        }
    }
}
