//! Glossary rule types

use serde::{Deserialize, Serialize};

/// Project terminology constraint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GlossaryRule {
    pub id: String,
    pub project_id: String,
    /// Restrict to one target language; `None` applies to all
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_id: Option<String>,
    pub term: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub non_translatable: bool,
    #[serde(default)]
    pub forbidden: bool,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forced_translation: Option<String>,
}

/// The single instruction a rule renders to, in precedence order
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum GlossaryDirective {
    Forbidden,
    NonTranslatable,
    ForcedTranslation(String),
    Note(String),
}

impl GlossaryDirective {
    /// Sort rank: lower renders first.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Forbidden => 0,
            Self::NonTranslatable => 1,
            Self::ForcedTranslation(_) => 2,
            Self::Note(_) => 3,
        }
    }
}

impl GlossaryRule {
    /// Pick exactly one directive: forbidden > non-translatable > forced translation > note.
    pub fn directive(&self) -> Option<GlossaryDirective> {
        if self.forbidden {
            return Some(GlossaryDirective::Forbidden);
        }
        if self.non_translatable {
            return Some(GlossaryDirective::NonTranslatable);
        }
        if let Some(forced) = self.forced_translation.as_deref().map(str::trim) {
            if !forced.is_empty() {
                return Some(GlossaryDirective::ForcedTranslation(forced.to_string()));
            }
        }
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(|d| GlossaryDirective::Note(d.to_string()))
    }

    /// More than one exclusive flag is set.
    pub fn has_conflicting_flags(&self) -> bool {
        let forced = self
            .forced_translation
            .as_deref()
            .is_some_and(|f| !f.trim().is_empty());
        [self.forbidden, self.non_translatable, forced]
            .iter()
            .filter(|f| **f)
            .count()
            > 1
    }

    /// Whether the rule targets `language_id`.
    pub fn applies_to(&self, language_id: &str) -> bool {
        self.language_id
            .as_deref()
            .is_none_or(|l| l == language_id)
    }

    /// Render as one prompt bullet.
    ///
    /// A description on a rule with a stronger directive follows it as context.
    pub fn render(&self) -> Option<String> {
        let case_note = if self.case_sensitive {
            " (case-sensitive)"
        } else {
            ""
        };
        let term = &self.term;
        let context = self
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(|d| format!(" Context: {d}"))
            .unwrap_or_default();
        self.directive().map(|d| {
            let instruction = match d {
                GlossaryDirective::Forbidden => {
                    "never use this term in the translation.".to_string()
                }
                GlossaryDirective::NonTranslatable => {
                    "keep exactly as written, do not translate.".to_string()
                }
                GlossaryDirective::ForcedTranslation(t) => format!("always translate as \"{t}\"."),
                GlossaryDirective::Note(n) => return format!("- \"{term}\"{case_note}: {n}"),
            };
            format!("- \"{term}\"{case_note}: {instruction}{context}")
        })
    }
}
