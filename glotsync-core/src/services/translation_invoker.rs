//! Translation model invocation
//!
//! One model call per (chunk, target language). Source strings are sent under opaque
//! ids (`k1`, `k2`, ...) so key names never leak into the prompt, and the reply is mapped
//! back by id.

use std::collections::BTreeMap;
use std::sync::Arc;

use glotsync_provider::{CompletionRequest, TranslationModel};
use serde_json::{Map, Value};

use crate::error::{CoreError, CoreResult};
use crate::services::GlossaryService;
use crate::types::{GlossaryRule, Language};
use crate::utils::placeholder::missing_placeholders;

/// One source string to translate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    pub key_id: String,
    /// Dotted key name, used only for logging
    pub key: String,
    pub text: String,
}

/// Everything one model call needs
#[derive(Debug, Clone)]
pub struct TranslationBatch {
    pub source_language: Language,
    pub target_language: Language,
    pub entries: Vec<BatchEntry>,
    /// Already resolved and ordered by precedence
    pub glossary: Vec<GlossaryRule>,
    pub style_rules: Vec<String>,
}

/// Translation Invoker
pub struct TranslationInvoker {
    model: Arc<dyn TranslationModel>,
}

impl TranslationInvoker {
    #[must_use]
    pub fn new(model: Arc<dyn TranslationModel>) -> Self {
        Self { model }
    }

    /// Translate every entry of `batch`; returns key id -> translated text.
    ///
    /// Entries the model skipped, answered with an unusable shape, or whose
    /// placeholders were lost are absent from the map and stay stale.
    pub async fn translate(
        &self,
        batch: &TranslationBatch,
    ) -> CoreResult<BTreeMap<String, String>> {
        if batch.entries.is_empty() {
            return Ok(BTreeMap::new());
        }

        let (request, ids) = build_request(batch)?;
        log::debug!(
            "[{}] Translating {} entries {} -> {} with model {}",
            self.model.id(),
            batch.entries.len(),
            batch.source_language.code,
            batch.target_language.code,
            self.model.model()
        );

        let raw = self.model.complete(&request).await?;
        let translated = parse_response(&raw, &ids)?;

        let mut out = BTreeMap::new();
        for (opaque_id, entry) in &ids {
            let Some(text) = translated.get(opaque_id) else {
                continue;
            };
            let missing = missing_placeholders(&entry.text, text);
            if !missing.is_empty() {
                log::warn!(
                    "Dropping {} translation of '{}': placeholders lost: {}",
                    batch.target_language.code,
                    entry.key,
                    missing.join(", ")
                );
                continue;
            }
            out.insert(entry.key_id.clone(), text.clone());
        }
        Ok(out)
    }
}

/// Build the model request and the opaque id table for `batch`.
pub fn build_request(
    batch: &TranslationBatch,
) -> CoreResult<(CompletionRequest, Vec<(String, &BatchEntry)>)> {
    let ids: Vec<(String, &BatchEntry)> = batch
        .entries
        .iter()
        .enumerate()
        .map(|(i, entry)| (format!("k{}", i + 1), entry))
        .collect();

    let payload: Map<String, Value> = ids
        .iter()
        .map(|(id, entry)| (id.clone(), Value::String(entry.text.clone())))
        .collect();
    let user = serde_json::to_string_pretty(&payload)
        .map_err(|e| CoreError::SerializationError(e.to_string()))?;

    let request = CompletionRequest::new(system_prompt(batch), user).with_json_output();
    Ok((request, ids))
}

fn system_prompt(batch: &TranslationBatch) -> String {
    let source = &batch.source_language;
    let target = &batch.target_language;

    let mut prompt = format!(
        "You are a professional software localization translator.\n\
         Translate every value of the JSON object in the user message from {} to {}.\n\
         Target language: {}\n\n\
         Rules:\n\
         - Reply with one JSON object that has exactly the same keys \
           and the translated strings as values.\n\
         - Keep placeholders such as {{name}}, {{{{count}}}}, %s and %1$s unchanged.\n\
         - Keep HTML tags, Markdown markup and line breaks intact.\n\
         - Do not add explanations or comments.\n",
        source.label(),
        target.label(),
        target.label(),
    );

    let glossary = GlossaryService::render_directives(&batch.glossary);
    if !glossary.is_empty() {
        prompt.push_str("\nGlossary:\n");
        for line in glossary {
            prompt.push_str(&line);
            prompt.push('\n');
        }
    }

    if !batch.style_rules.is_empty() {
        prompt.push_str("\nStyle:\n");
        for rule in &batch.style_rules {
            prompt.push_str("- ");
            prompt.push_str(rule.trim());
            prompt.push('\n');
        }
    }

    prompt
}

/// Remove a surrounding Markdown code fence (` ```json ... ``` `), if any.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // drop the info string (`json`) on the opening line
    let body = match rest.find('\n') {
        Some(i) => &rest[i + 1..],
        None => rest,
    };
    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Map the model reply back to opaque ids.
fn parse_response(
    raw: &str,
    ids: &[(String, &BatchEntry)],
) -> CoreResult<BTreeMap<String, String>> {
    let body = strip_code_fence(raw);
    if body.is_empty() {
        return Err(CoreError::EmptyResponse);
    }

    let value: Value = serde_json::from_str(body).map_err(|e| {
        log::debug!(
            "Unparsable model response: {}",
            glotsync_provider::log_sanitizer::truncate_for_log(body)
        );
        CoreError::InvalidResponse(format!("response is not valid JSON: {e}"))
    })?;
    let Value::Object(object) = value else {
        return Err(CoreError::InvalidResponse(
            "response is not a JSON object".to_string(),
        ));
    };

    let mut out = BTreeMap::new();
    for (id, _) in ids {
        match object.get(id) {
            Some(Value::String(s)) => {
                out.insert(id.clone(), s.clone());
            }
            Some(v @ (Value::Number(_) | Value::Bool(_))) => {
                out.insert(id.clone(), v.to_string());
            }
            Some(other) => log::debug!("Ignoring non-scalar value for {id}: {other}"),
            None => {}
        }
    }

    if out.is_empty() {
        return Err(CoreError::InvalidResponse(
            "response matches none of the requested ids".to_string(),
        ));
    }

    let unknown = object.keys().filter(|k| !out.contains_key(*k)).count();
    if unknown > 0 {
        log::debug!("Ignored {unknown} unusable or unknown entries in model response");
    }
    Ok(out)
}
