use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // workspaces 表
        manager
            .create_table(
                Table::create()
                    .table(Workspace::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Workspace::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Workspace::OrganizationId).string().not_null())
                    .col(ColumnDef::new(Workspace::Name).string().not_null())
                    .col(ColumnDef::new(Workspace::KeyLimit).big_integer().null())
                    .to_owned(),
            )
            .await?;

        // projects 表
        manager
            .create_table(
                Table::create()
                    .table(Project::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Project::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Project::WorkspaceId).string().not_null())
                    .col(ColumnDef::new(Project::Name).string().not_null())
                    .col(ColumnDef::new(Project::PrimaryLanguageId).string().not_null())
                    .col(
                        ColumnDef::new(Project::StyleRules)
                            .string()
                            .not_null()
                            .default("[]"),
                    )
                    .to_owned(),
            )
            .await?;

        // namespaces 表
        manager
            .create_table(
                Table::create()
                    .table(Namespace::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Namespace::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Namespace::ProjectId).string().not_null())
                    .col(ColumnDef::new(Namespace::Name).string().not_null())
                    .to_owned(),
            )
            .await?;

        // languages 表
        manager
            .create_table(
                Table::create()
                    .table(Language::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Language::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Language::ProjectId).string().not_null())
                    .col(ColumnDef::new(Language::Code).string().not_null())
                    .col(ColumnDef::new(Language::Name).string().not_null())
                    .col(
                        ColumnDef::new(Language::Deleted)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        // translation_keys 表
        manager
            .create_table(
                Table::create()
                    .table(TranslationKey::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TranslationKey::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TranslationKey::WorkspaceId).string().not_null())
                    .col(ColumnDef::new(TranslationKey::ProjectId).string().not_null())
                    .col(ColumnDef::new(TranslationKey::NamespaceId).string().not_null())
                    .col(ColumnDef::new(TranslationKey::Key).string().not_null())
                    .col(ColumnDef::new(TranslationKey::Status).string().not_null())
                    .col(
                        ColumnDef::new(TranslationKey::ValuesJson)
                            .string()
                            .not_null()
                            .default("{}"),
                    )
                    .col(
                        ColumnDef::new(TranslationKey::FreshnessJson)
                            .string()
                            .not_null()
                            .default("{}"),
                    )
                    .col(
                        ColumnDef::new(TranslationKey::RevisionsJson)
                            .string()
                            .not_null()
                            .default("{}"),
                    )
                    .col(ColumnDef::new(TranslationKey::LeaseOwner).string().null())
                    .col(ColumnDef::new(TranslationKey::LeaseExpiresAt).string().null())
                    .col(ColumnDef::new(TranslationKey::LastDispatch).string().null())
                    .col(
                        ColumnDef::new(TranslationKey::Version)
                            .big_integer()
                            .not_null()
                            .default(1),
                    )
                    .col(ColumnDef::new(TranslationKey::CreatedAt).string().not_null())
                    .col(ColumnDef::new(TranslationKey::UpdatedAt).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_translation_keys_namespace_key")
                    .table(TranslationKey::Table)
                    .if_not_exists()
                    .col(TranslationKey::NamespaceId)
                    .col(TranslationKey::Key)
                    .to_owned(),
            )
            .await?;

        // translation_values 表
        manager
            .create_table(
                Table::create()
                    .table(TranslationValue::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(TranslationValue::KeyId).string().not_null())
                    .col(
                        ColumnDef::new(TranslationValue::LanguageId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(TranslationValue::ProjectId).string().not_null())
                    .col(
                        ColumnDef::new(TranslationValue::NamespaceId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(TranslationValue::Key).string().not_null())
                    .col(ColumnDef::new(TranslationValue::Value).string().not_null())
                    .col(
                        ColumnDef::new(TranslationValue::Fresh)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .primary_key(
                        Index::create()
                            .col(TranslationValue::KeyId)
                            .col(TranslationValue::LanguageId),
                    )
                    .to_owned(),
            )
            .await?;

        // usage_counters 表
        manager
            .create_table(
                Table::create()
                    .table(UsageCounter::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(UsageCounter::Scope).string().not_null())
                    .col(ColumnDef::new(UsageCounter::ScopeId).string().not_null())
                    .col(
                        ColumnDef::new(UsageCounter::TranslationKeys)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .primary_key(
                        Index::create()
                            .col(UsageCounter::Scope)
                            .col(UsageCounter::ScopeId),
                    )
                    .to_owned(),
            )
            .await?;

        // glossary_rules 表
        manager
            .create_table(
                Table::create()
                    .table(GlossaryRule::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GlossaryRule::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(GlossaryRule::ProjectId).string().not_null())
                    .col(ColumnDef::new(GlossaryRule::LanguageId).string().null())
                    .col(ColumnDef::new(GlossaryRule::Term).string().not_null())
                    .col(ColumnDef::new(GlossaryRule::Description).string().null())
                    .col(
                        ColumnDef::new(GlossaryRule::NonTranslatable)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(GlossaryRule::Forbidden)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(GlossaryRule::CaseSensitive)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(GlossaryRule::ForcedTranslation).string().null())
                    .to_owned(),
            )
            .await?;

        // key_references 表
        manager
            .create_table(
                Table::create()
                    .table(KeyReference::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(KeyReference::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(KeyReference::KeyId).string().not_null())
                    .col(ColumnDef::new(KeyReference::Source).string().not_null())
                    .col(
                        ColumnDef::new(KeyReference::Payload)
                            .string()
                            .not_null()
                            .default("null"),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(KeyReference::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(GlossaryRule::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UsageCounter::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TranslationValue::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TranslationKey::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Language::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Namespace::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Project::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Workspace::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Workspace {
    #[sea_orm(iden = "workspaces")]
    Table,
    Id,
    OrganizationId,
    Name,
    KeyLimit,
}

#[derive(DeriveIden)]
enum Project {
    #[sea_orm(iden = "projects")]
    Table,
    Id,
    WorkspaceId,
    Name,
    PrimaryLanguageId,
    StyleRules,
}

#[derive(DeriveIden)]
enum Namespace {
    #[sea_orm(iden = "namespaces")]
    Table,
    Id,
    ProjectId,
    Name,
}

#[derive(DeriveIden)]
enum Language {
    #[sea_orm(iden = "languages")]
    Table,
    Id,
    ProjectId,
    Code,
    Name,
    Deleted,
}

#[derive(DeriveIden)]
enum TranslationKey {
    #[sea_orm(iden = "translation_keys")]
    Table,
    Id,
    WorkspaceId,
    ProjectId,
    NamespaceId,
    Key,
    Status,
    ValuesJson,
    FreshnessJson,
    RevisionsJson,
    LeaseOwner,
    LeaseExpiresAt,
    LastDispatch,
    Version,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum TranslationValue {
    #[sea_orm(iden = "translation_values")]
    Table,
    KeyId,
    LanguageId,
    ProjectId,
    NamespaceId,
    Key,
    Value,
    Fresh,
}

#[derive(DeriveIden)]
enum UsageCounter {
    #[sea_orm(iden = "usage_counters")]
    Table,
    Scope,
    ScopeId,
    TranslationKeys,
}

#[derive(DeriveIden)]
enum GlossaryRule {
    #[sea_orm(iden = "glossary_rules")]
    Table,
    Id,
    ProjectId,
    LanguageId,
    Term,
    Description,
    NonTranslatable,
    Forbidden,
    CaseSensitive,
    ForcedTranslation,
}

#[derive(DeriveIden)]
enum KeyReference {
    #[sea_orm(iden = "key_references")]
    Table,
    Id,
    KeyId,
    Source,
    Payload,
}
