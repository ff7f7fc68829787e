//! Glossary resolution

use std::sync::Arc;

use crate::error::{CoreError, CoreResult};
use crate::services::ServiceContext;
use crate::types::GlossaryRule;

/// Maximum term length accepted by `save_rule`
const MAX_TERM_LENGTH: usize = 200;

/// Glossary Resolver
pub struct GlossaryService {
    ctx: Arc<ServiceContext>,
}

impl GlossaryService {
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    /// Rules that apply to `language_id`, ordered by directive precedence then term.
    ///
    /// Rules scoped to another language and rules that carry no instruction are dropped.
    pub async fn resolve(
        &self,
        project_id: &str,
        language_id: &str,
    ) -> CoreResult<Vec<GlossaryRule>> {
        let mut ranked: Vec<(u8, GlossaryRule)> = self
            .ctx
            .glossary_repository()
            .find_by_project(project_id)
            .await?
            .into_iter()
            .filter(|r| r.applies_to(language_id))
            .filter_map(|r| r.directive().map(|d| (d.rank(), r)))
            .collect();

        ranked.sort_by(|(ra, a), (rb, b)| ra.cmp(rb).then_with(|| a.term.cmp(&b.term)));

        log::debug!(
            "Resolved {} glossary rules for project {project_id}, language {language_id}",
            ranked.len()
        );
        Ok(ranked.into_iter().map(|(_, r)| r).collect())
    }

    /// Prompt bullets for already-resolved rules, in the given order.
    pub fn render_directives(rules: &[GlossaryRule]) -> Vec<String> {
        rules.iter().filter_map(GlossaryRule::render).collect()
    }

    /// Create or update a glossary rule
    pub async fn save_rule(&self, mut rule: GlossaryRule) -> CoreResult<GlossaryRule> {
        rule.term = rule.term.trim().to_string();
        if rule.term.is_empty() {
            return Err(CoreError::ValidationError(
                "Glossary term cannot be empty".to_string(),
            ));
        }
        if rule.term.len() > MAX_TERM_LENGTH {
            return Err(CoreError::ValidationError(format!(
                "Glossary term cannot exceed {MAX_TERM_LENGTH} bytes"
            )));
        }
        if rule.directive().is_none() {
            return Err(CoreError::ValidationError(format!(
                "Glossary rule for '{}' sets no flag, translation or description",
                rule.term
            )));
        }

        self.ctx.require_project(&rule.project_id).await?;
        if let Some(language_id) = &rule.language_id {
            self.ctx
                .require_language(&rule.project_id, language_id)
                .await?;
        }

        if rule.has_conflicting_flags() {
            log::warn!(
                "Glossary rule '{}' sets several exclusive flags; only {:?} will be applied",
                rule.term,
                rule.directive()
            );
        }

        if rule.id.is_empty() {
            rule.id = uuid::Uuid::new_v4().to_string();
        }
        self.ctx.glossary_repository().save(&rule).await?;
        log::info!("Saved glossary rule {} ('{}')", rule.id, rule.term);
        Ok(rule)
    }

    pub async fn delete_rule(&self, rule_id: &str) -> CoreResult<()> {
        self.ctx.glossary_repository().delete(rule_id).await
    }

    /// All rules of a project, unfiltered, ordered by term
    pub async fn list_rules(&self, project_id: &str) -> CoreResult<Vec<GlossaryRule>> {
        let mut rules = self
            .ctx
            .glossary_repository()
            .find_by_project(project_id)
            .await?;
        rules.sort_by(|a, b| a.term.cmp(&b.term));
        Ok(rules)
    }
}
