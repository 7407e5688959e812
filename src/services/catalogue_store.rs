//! Catalogue store contract consumed by the reconciliation engine.
//!
//! The engine opens one [`CatalogueUnit`] per reconciliation unit. Every read
//! and write for that unit goes through it, and the unit is either committed
//! or rolled back as a whole.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, SqlErr, TransactionTrait,
};

use crate::database::entities::{
    catalogue_columns, catalogue_databases, catalogue_tables, servers,
};
use crate::errors::{CatalogueError, CatalogueResult};
use crate::ingestion::{PersistenceKind, RowDescriptor};

/// The four reviewer-owned values carried on every column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ColumnIntent {
    pub in_analysis: bool,
    pub in_api_scope: bool,
    pub selected_for_load: bool,
    pub persistence_kind: PersistenceKind,
}

impl ColumnIntent {
    pub fn from_model(column: &catalogue_columns::Model) -> Self {
        Self {
            in_analysis: column.in_analysis,
            in_api_scope: column.in_api_scope,
            selected_for_load: column.selected_for_load,
            persistence_kind: column.persistence(),
        }
    }
}

impl From<&RowDescriptor> for ColumnIntent {
    fn from(row: &RowDescriptor) -> Self {
        Self {
            in_analysis: row.in_analysis,
            in_api_scope: row.in_api_scope,
            selected_for_load: row.selected_for_load,
            persistence_kind: row.persistence_kind,
        }
    }
}

/// Column to be created by the engine
#[derive(Debug, Clone)]
pub struct NewColumn {
    pub name: String,
    pub sort_order: i32,
    pub intent: ColumnIntent,
}

/// Source of reconciliation units
#[async_trait]
pub trait CatalogueStore: Send + Sync {
    type Unit: CatalogueUnit;

    /// Start an atomic unit of work
    async fn begin_unit(&self) -> CatalogueResult<Self::Unit>;
}

/// Reads and writes for a single reconciliation unit
#[async_trait]
pub trait CatalogueUnit: Send + Sync {
    async fn find_server(&self, name: &str) -> CatalogueResult<Option<servers::Model>>;

    async fn create_server(&self, name: &str) -> CatalogueResult<servers::Model>;

    async fn find_database(
        &self,
        server_id: i32,
        name: &str,
    ) -> CatalogueResult<Option<catalogue_databases::Model>>;

    async fn create_database(
        &self,
        server_id: i32,
        name: &str,
    ) -> CatalogueResult<catalogue_databases::Model>;

    async fn find_table(
        &self,
        database_id: i32,
        schema_name: &str,
        table_name: &str,
    ) -> CatalogueResult<Option<catalogue_tables::Model>>;

    async fn create_table(
        &self,
        database_id: i32,
        schema_name: &str,
        table_name: &str,
        estimated_row_count: Option<i64>,
    ) -> CatalogueResult<catalogue_tables::Model>;

    async fn set_estimated_row_count(&self, table_id: i32, count: i64) -> CatalogueResult<()>;

    /// All columns of a table, ordered by sort order
    async fn columns(&self, table_id: i32) -> CatalogueResult<Vec<catalogue_columns::Model>>;

    async fn insert_column(
        &self,
        table_id: i32,
        column: &NewColumn,
    ) -> CatalogueResult<catalogue_columns::Model>;

    async fn update_column_intent(
        &self,
        column_id: i32,
        intent: &ColumnIntent,
    ) -> CatalogueResult<()>;

    async fn delete_column(&self, column_id: i32) -> CatalogueResult<()>;

    async fn commit(self) -> CatalogueResult<()>;

    async fn rollback(self) -> CatalogueResult<()>;
}

/// SQLite-backed catalogue store
#[derive(Clone)]
pub struct SeaOrmCatalogueStore {
    db: DatabaseConnection,
}

impl SeaOrmCatalogueStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl CatalogueStore for SeaOrmCatalogueStore {
    type Unit = SeaOrmCatalogueUnit;

    async fn begin_unit(&self) -> CatalogueResult<Self::Unit> {
        let txn = self.db.begin().await?;
        Ok(SeaOrmCatalogueUnit { txn })
    }
}

/// A database transaction scoped to one reconciliation unit
pub struct SeaOrmCatalogueUnit {
    txn: DatabaseTransaction,
}

fn insert_error(err: DbErr, what: String) -> CatalogueError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            CatalogueError::Conflict(format!("{} already exists", what))
        }
        _ => CatalogueError::Database(err),
    }
}

#[async_trait]
impl CatalogueUnit for SeaOrmCatalogueUnit {
    async fn find_server(&self, name: &str) -> CatalogueResult<Option<servers::Model>> {
        Ok(servers::Entity::find()
            .filter(servers::Column::Name.eq(name))
            .one(&self.txn)
            .await?)
    }

    async fn create_server(&self, name: &str) -> CatalogueResult<servers::Model> {
        let server = servers::ActiveModel {
            name: Set(name.to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        server
            .insert(&self.txn)
            .await
            .map_err(|e| insert_error(e, format!("server '{}'", name)))
    }

    async fn find_database(
        &self,
        server_id: i32,
        name: &str,
    ) -> CatalogueResult<Option<catalogue_databases::Model>> {
        Ok(catalogue_databases::Entity::find()
            .filter(catalogue_databases::Column::ServerId.eq(server_id))
            .filter(catalogue_databases::Column::Name.eq(name))
            .one(&self.txn)
            .await?)
    }

    async fn create_database(
        &self,
        server_id: i32,
        name: &str,
    ) -> CatalogueResult<catalogue_databases::Model> {
        let database = catalogue_databases::ActiveModel {
            server_id: Set(server_id),
            name: Set(name.to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        database
            .insert(&self.txn)
            .await
            .map_err(|e| insert_error(e, format!("database '{}'", name)))
    }

    async fn find_table(
        &self,
        database_id: i32,
        schema_name: &str,
        table_name: &str,
    ) -> CatalogueResult<Option<catalogue_tables::Model>> {
        Ok(catalogue_tables::Entity::find()
            .filter(catalogue_tables::Column::DatabaseId.eq(database_id))
            .filter(catalogue_tables::Column::SchemaName.eq(schema_name))
            .filter(catalogue_tables::Column::TableName.eq(table_name))
            .one(&self.txn)
            .await?)
    }

    async fn create_table(
        &self,
        database_id: i32,
        schema_name: &str,
        table_name: &str,
        estimated_row_count: Option<i64>,
    ) -> CatalogueResult<catalogue_tables::Model> {
        let now = Utc::now();
        let table = catalogue_tables::ActiveModel {
            database_id: Set(database_id),
            schema_name: Set(schema_name.to_string()),
            table_name: Set(table_name.to_string()),
            estimated_row_count: Set(estimated_row_count),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        table
            .insert(&self.txn)
            .await
            .map_err(|e| insert_error(e, format!("table '{}.{}'", schema_name, table_name)))
    }

    async fn set_estimated_row_count(&self, table_id: i32, count: i64) -> CatalogueResult<()> {
        let table = catalogue_tables::Entity::find_by_id(table_id)
            .one(&self.txn)
            .await?
            .ok_or_else(|| CatalogueError::NotFound(format!("table {}", table_id)))?;

        let mut active: catalogue_tables::ActiveModel = table.into();
        active.estimated_row_count = Set(Some(count));
        active.updated_at = Set(Utc::now());
        active.update(&self.txn).await?;

        Ok(())
    }

    async fn columns(&self, table_id: i32) -> CatalogueResult<Vec<catalogue_columns::Model>> {
        Ok(catalogue_columns::Entity::find()
            .filter(catalogue_columns::Column::TableId.eq(table_id))
            .order_by_asc(catalogue_columns::Column::SortOrder)
            .all(&self.txn)
            .await?)
    }

    async fn insert_column(
        &self,
        table_id: i32,
        column: &NewColumn,
    ) -> CatalogueResult<catalogue_columns::Model> {
        let now = Utc::now();
        let model = catalogue_columns::ActiveModel {
            table_id: Set(table_id),
            name: Set(column.name.clone()),
            name_key: Set(column.name.to_lowercase()),
            sort_order: Set(column.sort_order),
            persistence_kind: Set(column.intent.persistence_kind.into()),
            in_analysis: Set(column.intent.in_analysis),
            in_api_scope: Set(column.intent.in_api_scope),
            selected_for_load: Set(column.intent.selected_for_load),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        model
            .insert(&self.txn)
            .await
            .map_err(|e| insert_error(e, format!("column '{}'", column.name)))
    }

    async fn update_column_intent(
        &self,
        column_id: i32,
        intent: &ColumnIntent,
    ) -> CatalogueResult<()> {
        let column = catalogue_columns::Entity::find_by_id(column_id)
            .one(&self.txn)
            .await?
            .ok_or_else(|| CatalogueError::NotFound(format!("column {}", column_id)))?;

        let mut active: catalogue_columns::ActiveModel = column.into();
        active.in_analysis = Set(intent.in_analysis);
        active.in_api_scope = Set(intent.in_api_scope);
        active.selected_for_load = Set(intent.selected_for_load);
        active.persistence_kind = Set(intent.persistence_kind.into());
        active.updated_at = Set(Utc::now());
        active.update(&self.txn).await?;

        Ok(())
    }

    async fn delete_column(&self, column_id: i32) -> CatalogueResult<()> {
        let result = catalogue_columns::Entity::delete_by_id(column_id)
            .exec(&self.txn)
            .await?;

        if result.rows_affected == 0 {
            return Err(CatalogueError::NotFound(format!("column {}", column_id)));
        }

        Ok(())
    }

    async fn commit(self) -> CatalogueResult<()> {
        self.txn.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> CatalogueResult<()> {
        self.txn.rollback().await?;
        Ok(())
    }
}
