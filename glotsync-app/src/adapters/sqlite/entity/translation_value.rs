use sea_orm::entity::prelude::*;

/// Per-language projection of `translation_keys`, rewritten with every key write
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "translation_values")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub key_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub language_id: String,
    pub project_id: String,
    pub namespace_id: String,
    pub key: String,
    pub value: String,
    pub fresh: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
