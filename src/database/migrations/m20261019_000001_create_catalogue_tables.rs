use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Servers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Servers::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Servers::Name).string().not_null().unique_key())
                    .col(
                        ColumnDef::new(Servers::CreatedAt)
                            .date_time()
                            .not_null()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CatalogueDatabases::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CatalogueDatabases::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CatalogueDatabases::ServerId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CatalogueDatabases::Name).string().not_null())
                    .col(
                        ColumnDef::new(CatalogueDatabases::CreatedAt)
                            .date_time()
                            .not_null()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .index(
                        Index::create()
                            .name("idx_catalogue_databases_server_name")
                            .col(CatalogueDatabases::ServerId)
                            .col(CatalogueDatabases::Name)
                            .unique(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_catalogue_databases_server")
                            .from(CatalogueDatabases::Table, CatalogueDatabases::ServerId)
                            .to(Servers::Table, Servers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CatalogueTables::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CatalogueTables::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CatalogueTables::DatabaseId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CatalogueTables::SchemaName).string().not_null())
                    .col(ColumnDef::new(CatalogueTables::TableName).string().not_null())
                    .col(
                        ColumnDef::new(CatalogueTables::EstimatedRowCount)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(CatalogueTables::CreatedAt)
                            .date_time()
                            .not_null()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .col(
                        ColumnDef::new(CatalogueTables::UpdatedAt)
                            .date_time()
                            .not_null()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .index(
                        Index::create()
                            .name("idx_catalogue_tables_database_schema_table")
                            .col(CatalogueTables::DatabaseId)
                            .col(CatalogueTables::SchemaName)
                            .col(CatalogueTables::TableName)
                            .unique(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_catalogue_tables_database")
                            .from(CatalogueTables::Table, CatalogueTables::DatabaseId)
                            .to(CatalogueDatabases::Table, CatalogueDatabases::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CatalogueColumns::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CatalogueColumns::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CatalogueColumns::TableId).integer().not_null())
                    .col(ColumnDef::new(CatalogueColumns::Name).string().not_null())
                    .col(ColumnDef::new(CatalogueColumns::NameKey).string().not_null())
                    .col(ColumnDef::new(CatalogueColumns::SortOrder).integer().not_null())
                    .col(
                        ColumnDef::new(CatalogueColumns::PersistenceKind)
                            .string()
                            .not_null()
                            .default("R"),
                    )
                    .col(
                        ColumnDef::new(CatalogueColumns::InAnalysis)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(CatalogueColumns::InApiScope)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(CatalogueColumns::SelectedForLoad)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(CatalogueColumns::CreatedAt)
                            .date_time()
                            .not_null()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .col(
                        ColumnDef::new(CatalogueColumns::UpdatedAt)
                            .date_time()
                            .not_null()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .index(
                        Index::create()
                            .name("idx_catalogue_columns_table_name_key")
                            .col(CatalogueColumns::TableId)
                            .col(CatalogueColumns::NameKey)
                            .unique(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_catalogue_columns_table")
                            .from(CatalogueColumns::Table, CatalogueColumns::TableId)
                            .to(CatalogueTables::Table, CatalogueTables::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CatalogueColumns::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CatalogueTables::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CatalogueDatabases::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Servers::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Servers {
    Table,
    Id,
    Name,
    CreatedAt,
}

#[derive(DeriveIden)]
enum CatalogueDatabases {
    Table,
    Id,
    ServerId,
    Name,
    CreatedAt,
}

#[derive(DeriveIden)]
enum CatalogueTables {
    Table,
    Id,
    DatabaseId,
    SchemaName,
    TableName,
    EstimatedRowCount,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum CatalogueColumns {
    Table,
    Id,
    TableId,
    Name,
    NameKey,
    SortOrder,
    PersistenceKind,
    InAnalysis,
    InApiScope,
    SelectedForLoad,
    CreatedAt,
    UpdatedAt,
}
