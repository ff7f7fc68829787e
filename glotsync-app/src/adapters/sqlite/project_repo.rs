//! `ProjectRepository` implementation for `SqliteStore`.

use async_trait::async_trait;
use sea_orm::{
    sea_query::OnConflict, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder,
};

use glotsync_core::error::{CoreError, CoreResult};
use glotsync_core::traits::ProjectRepository;
use glotsync_core::types::{Language, Namespace, Project, Workspace};

use super::entity::{language, namespace, project, workspace};
use super::{from_json, storage_error, to_json, SqliteStore};

impl From<workspace::Model> for Workspace {
    fn from(row: workspace::Model) -> Self {
        Self {
            id: row.id,
            organization_id: row.organization_id,
            name: row.name,
            key_limit: row.key_limit.and_then(|l| u64::try_from(l).ok()),
        }
    }
}

impl project::Model {
    fn into_project(self) -> CoreResult<Project> {
        Ok(Project {
            style_rules: from_json(&self.style_rules, "style_rules")?,
            id: self.id,
            workspace_id: self.workspace_id,
            name: self.name,
            primary_language_id: self.primary_language_id,
        })
    }
}

impl From<namespace::Model> for Namespace {
    fn from(row: namespace::Model) -> Self {
        Self {
            id: row.id,
            project_id: row.project_id,
            name: row.name,
        }
    }
}

impl From<language::Model> for Language {
    fn from(row: language::Model) -> Self {
        Self {
            id: row.id,
            project_id: row.project_id,
            code: row.code,
            name: row.name,
            deleted: row.deleted != 0,
        }
    }
}

#[async_trait]
impl ProjectRepository for SqliteStore {
    async fn find_workspace(&self, id: &str) -> CoreResult<Option<Workspace>> {
        let row = workspace::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await
            .map_err(storage_error("Failed to query workspace"))?;
        Ok(row.map(Workspace::from))
    }

    async fn save_workspace(&self, ws: &Workspace) -> CoreResult<()> {
        let key_limit = ws
            .key_limit
            .map(|l| {
                i64::try_from(l).map_err(|_| {
                    CoreError::ValidationError(format!("Key limit {l} is out of range"))
                })
            })
            .transpose()?;

        workspace::Entity::insert(workspace::ActiveModel {
            id: Set(ws.id.clone()),
            organization_id: Set(ws.organization_id.clone()),
            name: Set(ws.name.clone()),
            key_limit: Set(key_limit),
        })
        .on_conflict(
            OnConflict::column(workspace::Column::Id)
                .update_columns([
                    workspace::Column::OrganizationId,
                    workspace::Column::Name,
                    workspace::Column::KeyLimit,
                ])
                .to_owned(),
        )
        .exec(&self.db)
        .await
        .map_err(storage_error("Failed to save workspace"))?;
        Ok(())
    }

    async fn find_project(&self, id: &str) -> CoreResult<Option<Project>> {
        project::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await
            .map_err(storage_error("Failed to query project"))?
            .map(project::Model::into_project)
            .transpose()
    }

    async fn save_project(&self, p: &Project) -> CoreResult<()> {
        project::Entity::insert(project::ActiveModel {
            id: Set(p.id.clone()),
            workspace_id: Set(p.workspace_id.clone()),
            name: Set(p.name.clone()),
            primary_language_id: Set(p.primary_language_id.clone()),
            style_rules: Set(to_json(&p.style_rules)?),
        })
        .on_conflict(
            OnConflict::column(project::Column::Id)
                .update_columns([
                    project::Column::Name,
                    project::Column::PrimaryLanguageId,
                    project::Column::StyleRules,
                ])
                .to_owned(),
        )
        .exec(&self.db)
        .await
        .map_err(storage_error("Failed to save project"))?;
        Ok(())
    }

    async fn list_projects(&self, workspace_id: &str) -> CoreResult<Vec<Project>> {
        project::Entity::find()
            .filter(project::Column::WorkspaceId.eq(workspace_id))
            .order_by_asc(project::Column::Name)
            .all(&self.db)
            .await
            .map_err(storage_error("Failed to list projects"))?
            .into_iter()
            .map(project::Model::into_project)
            .collect()
    }

    async fn find_namespace(&self, id: &str) -> CoreResult<Option<Namespace>> {
        let row = namespace::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await
            .map_err(storage_error("Failed to query namespace"))?;
        Ok(row.map(Namespace::from))
    }

    async fn save_namespace(&self, ns: &Namespace) -> CoreResult<()> {
        namespace::Entity::insert(namespace::ActiveModel {
            id: Set(ns.id.clone()),
            project_id: Set(ns.project_id.clone()),
            name: Set(ns.name.clone()),
        })
        .on_conflict(
            OnConflict::column(namespace::Column::Id)
                .update_column(namespace::Column::Name)
                .to_owned(),
        )
        .exec(&self.db)
        .await
        .map_err(storage_error("Failed to save namespace"))?;
        Ok(())
    }

    async fn list_namespaces(&self, project_id: &str) -> CoreResult<Vec<Namespace>> {
        let rows = namespace::Entity::find()
            .filter(namespace::Column::ProjectId.eq(project_id))
            .order_by_asc(namespace::Column::Name)
            .all(&self.db)
            .await
            .map_err(storage_error("Failed to list namespaces"))?;
        Ok(rows.into_iter().map(Namespace::from).collect())
    }

    async fn list_languages(&self, project_id: &str) -> CoreResult<Vec<Language>> {
        let rows = language::Entity::find()
            .filter(language::Column::ProjectId.eq(project_id))
            .order_by_asc(language::Column::Code)
            .all(&self.db)
            .await
            .map_err(storage_error("Failed to list languages"))?;
        Ok(rows.into_iter().map(Language::from).collect())
    }

    async fn save_language(&self, lang: &Language) -> CoreResult<()> {
        language::Entity::insert(language::ActiveModel {
            id: Set(lang.id.clone()),
            project_id: Set(lang.project_id.clone()),
            code: Set(lang.code.clone()),
            name: Set(lang.name.clone()),
            deleted: Set(i32::from(lang.deleted)),
        })
        .on_conflict(
            OnConflict::column(language::Column::Id)
                .update_columns([
                    language::Column::Code,
                    language::Column::Name,
                    language::Column::Deleted,
                ])
                .to_owned(),
        )
        .exec(&self.db)
        .await
        .map_err(storage_error("Failed to save language"))?;
        Ok(())
    }
}
