use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::ingestion::PersistenceKind;

/// A catalogued column and the reviewer intent recorded against it
///
/// `name_key` is the lower-cased column name; the unique index on
/// `(table_id, name_key)` makes column names case-insensitively unique per
/// table. `sort_order` leaves gaps so columns can be reordered by hand.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "catalogue_columns")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub table_id: i32,
    pub name: String,
    pub name_key: String,
    pub sort_order: i32,
    pub persistence_kind: String, // "R" or "D"
    pub in_analysis: bool,
    pub in_api_scope: bool,
    pub selected_for_load: bool,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

impl Model {
    pub fn persistence(&self) -> PersistenceKind {
        PersistenceKind::from_stored(&self.persistence_kind)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::catalogue_tables::Entity",
        from = "Column::TableId",
        to = "super::catalogue_tables::Column::Id"
    )]
    Tables,
}

impl Related<super::catalogue_tables::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tables.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
