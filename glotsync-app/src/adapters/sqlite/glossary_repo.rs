//! `GlossaryRepository` implementation for `SqliteStore`.

use async_trait::async_trait;
use sea_orm::{sea_query::OnConflict, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter};

use glotsync_core::error::CoreResult;
use glotsync_core::traits::GlossaryRepository;
use glotsync_core::types::GlossaryRule;

use super::entity::glossary_rule;
use super::{storage_error, SqliteStore};

impl From<glossary_rule::Model> for GlossaryRule {
    fn from(row: glossary_rule::Model) -> Self {
        Self {
            id: row.id,
            project_id: row.project_id,
            language_id: row.language_id,
            term: row.term,
            description: row.description,
            non_translatable: row.non_translatable != 0,
            forbidden: row.forbidden != 0,
            case_sensitive: row.case_sensitive != 0,
            forced_translation: row.forced_translation,
        }
    }
}

fn rule_to_active_model(rule: &GlossaryRule) -> glossary_rule::ActiveModel {
    glossary_rule::ActiveModel {
        id: Set(rule.id.clone()),
        project_id: Set(rule.project_id.clone()),
        language_id: Set(rule.language_id.clone()),
        term: Set(rule.term.clone()),
        description: Set(rule.description.clone()),
        non_translatable: Set(i32::from(rule.non_translatable)),
        forbidden: Set(i32::from(rule.forbidden)),
        case_sensitive: Set(i32::from(rule.case_sensitive)),
        forced_translation: Set(rule.forced_translation.clone()),
    }
}

#[async_trait]
impl GlossaryRepository for SqliteStore {
    async fn find_by_project(&self, project_id: &str) -> CoreResult<Vec<GlossaryRule>> {
        let rows = glossary_rule::Entity::find()
            .filter(glossary_rule::Column::ProjectId.eq(project_id))
            .all(&self.db)
            .await
            .map_err(storage_error("Failed to query glossary"))?;
        Ok(rows.into_iter().map(GlossaryRule::from).collect())
    }

    async fn save(&self, rule: &GlossaryRule) -> CoreResult<()> {
        glossary_rule::Entity::insert(rule_to_active_model(rule))
            .on_conflict(
                OnConflict::column(glossary_rule::Column::Id)
                    .update_columns([
                        glossary_rule::Column::LanguageId,
                        glossary_rule::Column::Term,
                        glossary_rule::Column::Description,
                        glossary_rule::Column::NonTranslatable,
                        glossary_rule::Column::Forbidden,
                        glossary_rule::Column::CaseSensitive,
                        glossary_rule::Column::ForcedTranslation,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await
            .map_err(storage_error("Failed to save glossary rule"))?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> CoreResult<()> {
        glossary_rule::Entity::delete_by_id(id.to_string())
            .exec(&self.db)
            .await
            .map_err(storage_error("Failed to delete glossary rule"))?;
        Ok(())
    }
}
