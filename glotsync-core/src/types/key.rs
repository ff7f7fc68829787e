//! Translation key types

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Key lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum KeyStatus {
    /// Editable, no translation in flight
    Active,
    /// Held by a dispatch lease; primary edits are rejected
    Locked,
    /// Terminal; never dispatched again
    Deleted,
}

/// Per-language freshness relative to the current primary value
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Freshness {
    Fresh,
    Stale,
}

/// What a caller sees for one language of a key
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum LanguageState {
    /// Value matches the current primary
    Fresh,
    /// Stale and a dispatch currently holds the key
    Pending,
    /// Stale after a dispatch that requested this language finished
    Failed,
    /// Stale and no finished dispatch asked for this language
    NotRequested,
}

/// Dispatch lease: single-writer guard for a key while it is re-translated
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct KeyLease {
    /// Chunk id that owns the key
    pub owner: String,
    /// After this instant the lease no longer blocks anyone
    #[serde(with = "crate::utils::datetime")]
    pub expires_at: DateTime<Utc>,
}

impl KeyLease {
    pub fn new(owner: impl Into<String>, now: DateTime<Utc>, ttl: chrono::Duration) -> Self {
        Self {
            owner: owner.into(),
            expires_at: now + ttl,
        }
    }

    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Outcome marker written when a chunk releases a key
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DispatchStamp {
    pub chunk_id: String,
    /// Target languages the chunk asked the model for
    pub requested_languages: Vec<String>,
    #[serde(with = "crate::utils::datetime")]
    pub finished_at: DateTime<Utc>,
}

/// A translation key with its values in every language
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationKey {
    /// Key ID (UUID)
    pub id: String,
    pub workspace_id: String,
    pub project_id: String,
    pub namespace_id: String,
    /// Dotted identifier, unique per namespace among live keys
    pub key: String,
    /// language id -> value
    pub values: BTreeMap<String, String>,
    /// language id -> freshness
    pub freshness: BTreeMap<String, Freshness>,
    /// language id -> write counter, bumped on every write to that language
    #[serde(default)]
    pub revisions: BTreeMap<String, u64>,
    pub status: KeyStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lease: Option<KeyLease>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_dispatch: Option<DispatchStamp>,
    pub version: u64,
    #[serde(with = "crate::utils::datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::utils::datetime")]
    pub updated_at: DateTime<Utc>,
}

impl TranslationKey {
    /// Status with expired leases treated as released.
    pub fn effective_status(&self, now: DateTime<Utc>) -> KeyStatus {
        match self.status {
            KeyStatus::Deleted => KeyStatus::Deleted,
            KeyStatus::Locked if self.lease.as_ref().is_some_and(|l| l.is_live(now)) => {
                KeyStatus::Locked
            }
            _ => KeyStatus::Active,
        }
    }

    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.effective_status(now) == KeyStatus::Locked
    }

    pub fn is_deleted(&self) -> bool {
        self.status == KeyStatus::Deleted
    }

    /// Whether a live lease is held by someone other than `owner`.
    pub fn is_leased_by_other(&self, owner: &str, now: DateTime<Utc>) -> bool {
        self.lease
            .as_ref()
            .is_some_and(|l| l.is_live(now) && l.owner != owner)
    }

    pub fn revision(&self, language_id: &str) -> u64 {
        self.revisions.get(language_id).copied().unwrap_or_default()
    }

    pub fn is_fresh(&self, language_id: &str) -> bool {
        self.values.contains_key(language_id)
            && self.freshness.get(language_id) == Some(&Freshness::Fresh)
    }

    /// Classify one language for display.
    pub fn language_state(&self, language_id: &str, now: DateTime<Utc>) -> LanguageState {
        if self.is_fresh(language_id) {
            return LanguageState::Fresh;
        }
        if self.is_locked(now) {
            return LanguageState::Pending;
        }
        let requested = self
            .last_dispatch
            .as_ref()
            .is_some_and(|s| s.requested_languages.iter().any(|l| l == language_id));
        if requested {
            LanguageState::Failed
        } else {
            LanguageState::NotRequested
        }
    }

    /// Set a value, mark it fresh and bump its revision.
    pub fn put_value(&mut self, language_id: &str, value: String) {
        self.values.insert(language_id.to_string(), value);
        self.freshness
            .insert(language_id.to_string(), Freshness::Fresh);
        *self.revisions.entry(language_id.to_string()).or_insert(0) += 1;
    }

    /// Remove a value and bump its revision so in-flight merges for it are discarded.
    pub fn remove_value(&mut self, language_id: &str) {
        self.values.remove(language_id);
        self.freshness.remove(language_id);
        *self.revisions.entry(language_id.to_string()).or_insert(0) += 1;
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.version += 1;
        self.updated_at = now;
    }
}

/// How a single merge write was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeDisposition {
    Applied,
    Conflict,
    LostLease,
}

// State transitions shared by every `KeyRepository` implementation. Repositories load
// the key, call one of these inside their atomic section and persist the result.
impl TranslationKey {
    /// Apply a primary or secondary value write.
    pub fn apply_write(&mut self, write: &ValueWrite) -> CoreResult<()> {
        if self.is_deleted() {
            return Err(CoreError::KeyNotFound(self.id.clone()));
        }
        match &write.kind {
            WriteKind::Primary {
                lease,
                stale_languages,
            } => {
                if self.is_locked(write.now) {
                    return Err(CoreError::KeyLocked(self.id.clone()));
                }
                self.put_value(&write.language_id, write.value.clone());
                for language_id in stale_languages {
                    if language_id != &write.language_id {
                        self.freshness.insert(language_id.clone(), Freshness::Stale);
                    }
                }
                if let Some(lease) = lease {
                    self.status = KeyStatus::Locked;
                    self.lease = Some(lease.clone());
                }
            }
            WriteKind::Secondary => {
                self.put_value(&write.language_id, write.value.clone());
            }
        }
        self.touch(write.now);
        Ok(())
    }

    /// Drop a non-primary value.
    pub fn clear_language(&mut self, language_id: &str, now: DateTime<Utc>) -> CoreResult<()> {
        if self.is_deleted() {
            return Err(CoreError::KeyNotFound(self.id.clone()));
        }
        self.remove_value(language_id);
        self.touch(now);
        Ok(())
    }

    /// Take `lease` unless the key is deleted or leased live by another owner.
    pub fn try_acquire(&mut self, lease: &KeyLease, now: DateTime<Utc>) -> bool {
        if self.is_deleted() || self.is_leased_by_other(&lease.owner, now) {
            return false;
        }
        self.status = KeyStatus::Locked;
        self.lease = Some(lease.clone());
        self.touch(now);
        true
    }

    /// Merge one translated value for `language_id` on behalf of chunk `owner`.
    pub fn merge_translation(
        &mut self,
        owner: &str,
        language_id: &str,
        write: &MergeWrite,
        now: DateTime<Utc>,
    ) -> MergeDisposition {
        let holds_lease = !self.is_deleted()
            && self
                .lease
                .as_ref()
                .is_some_and(|l| l.owner == owner && l.is_live(now));
        if !holds_lease {
            return MergeDisposition::LostLease;
        }
        if self.revision(language_id) != write.expected_revision {
            return MergeDisposition::Conflict;
        }
        self.put_value(language_id, write.value.clone());
        self.touch(now);
        MergeDisposition::Applied
    }

    /// Release the lease held by `owner` and record the dispatch outcome.
    pub fn release(&mut self, owner: &str, stamp: &DispatchStamp) -> bool {
        if self.lease.as_ref().is_none_or(|l| l.owner != owner) {
            return false;
        }
        self.lease = None;
        if !self.is_deleted() {
            self.status = KeyStatus::Active;
            self.last_dispatch = Some(stamp.clone());
        }
        self.touch(stamp.finished_at);
        true
    }

    /// Clear a lease whose owner never came back.
    pub fn release_if_expired(&mut self, now: DateTime<Utc>) -> bool {
        if self.lease.as_ref().is_none_or(|l| l.is_live(now)) {
            return false;
        }
        self.lease = None;
        if !self.is_deleted() {
            self.status = KeyStatus::Active;
        }
        self.touch(now);
        true
    }

    /// Mark deleted. Returns `false` when the key already was.
    ///
    /// The lease record is kept so the owning chunk still counts it as released.
    pub fn mark_deleted(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_deleted() {
            return false;
        }
        self.status = KeyStatus::Deleted;
        self.touch(now);
        true
    }
}

/// Materialized `(key, language)` row for per-language listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TranslationValue {
    pub key_id: String,
    pub project_id: String,
    pub namespace_id: String,
    pub language_id: String,
    pub key: String,
    pub value: String,
    pub fresh: bool,
}

impl TranslationValue {
    /// Projection rows for every value currently held by `key`.
    pub fn project(key: &TranslationKey) -> Vec<Self> {
        key.values
            .iter()
            .map(|(language_id, value)| Self::of(key, language_id, value))
            .collect()
    }

    pub fn of(key: &TranslationKey, language_id: &str, value: &str) -> Self {
        Self {
            key_id: key.id.clone(),
            project_id: key.project_id.clone(),
            namespace_id: key.namespace_id.clone(),
            language_id: language_id.to_string(),
            key: key.key.clone(),
            value: value.to_string(),
            fresh: key.is_fresh(language_id),
        }
    }
}

/// Primary or secondary value write, applied atomically by the key repository
#[derive(Debug, Clone)]
pub struct ValueWrite {
    pub key_id: String,
    pub language_id: String,
    pub value: String,
    pub kind: WriteKind,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum WriteKind {
    /// Primary edit: rejected while locked, marks `stale_languages` stale and takes `lease`.
    /// Without a lease the key stays unlocked until a later dispatch leases it.
    Primary {
        lease: Option<KeyLease>,
        stale_languages: Vec<String>,
    },
    /// Manual edit of a target language; allowed while locked
    Secondary,
}

/// One translated value to merge, guarded by the revision read at dispatch time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeWrite {
    pub key_id: String,
    pub value: String,
    pub expected_revision: u64,
}

/// Result of a per-language merge
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Keys whose value was written
    pub applied: Vec<String>,
    /// Keys edited by someone else since the source snapshot
    pub conflicts: Vec<String>,
    /// Keys no longer leased by this chunk (deleted, expired, taken over)
    pub lost_lease: Vec<String>,
}
