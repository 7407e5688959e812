use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A schema-qualified table within a catalogued database
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "catalogue_tables")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub database_id: i32,
    pub schema_name: String,
    pub table_name: String,
    pub estimated_row_count: Option<i64>,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::catalogue_databases::Entity",
        from = "Column::DatabaseId",
        to = "super::catalogue_databases::Column::Id"
    )]
    Databases,
    #[sea_orm(has_many = "super::catalogue_columns::Entity")]
    Columns,
}

impl Related<super::catalogue_databases::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Databases.def()
    }
}

impl Related<super::catalogue_columns::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Columns.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
