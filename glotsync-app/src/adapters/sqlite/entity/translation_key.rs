use sea_orm::entity::prelude::*;

/// Canonical key row. Per-language maps and the dispatch stamp are stored as JSON.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "translation_keys")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub workspace_id: String,
    pub project_id: String,
    pub namespace_id: String,
    pub key: String,
    /// `active` / `locked` / `deleted`
    pub status: String,
    pub values_json: String,
    pub freshness_json: String,
    pub revisions_json: String,
    pub lease_owner: Option<String>,
    pub lease_expires_at: Option<String>,
    pub last_dispatch: Option<String>,
    pub version: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
