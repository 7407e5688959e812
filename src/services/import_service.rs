use sea_orm::DatabaseConnection;
use serde::Serialize;
use tokio::task;
use tracing::info;

use crate::config::CatalogueConfig;
use crate::database::connect_and_migrate;
use crate::errors::{CatalogueError, IngestResult};
use crate::ingestion::{parse_dacpac, spreadsheet, RowDescriptor, SpreadsheetImport};
use crate::services::catalogue_store::SeaOrmCatalogueStore;
use crate::services::reconciliation_service::{
    ConflictPolicy, ImportResult, ReconciliationService,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportSource {
    Dacpac,
    Spreadsheet,
}

/// Outcome of one import run, as printed by the CLI
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub source: ImportSource,
    pub policy: ConflictPolicy,
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet_name: Option<String>,
    pub rows_read: usize,
    pub unrecognized_headers: Vec<String>,
    /// One entry per discarded row, `schema.table.column: reason`
    pub row_warnings: Vec<String>,
    pub result: ImportResult,
}

/// Parses an input file and reconciles it into the SQLite catalogue
pub struct ImportService {
    reconciler: ReconciliationService<SeaOrmCatalogueStore>,
    config: CatalogueConfig,
}

impl ImportService {
    pub fn new(db: DatabaseConnection, config: CatalogueConfig) -> Self {
        let reconciler = ReconciliationService::new(SeaOrmCatalogueStore::new(db))
            .with_sort_order_step(config.sort_order_step);
        Self { reconciler, config }
    }

    /// Open the configured database, running pending migrations first
    pub async fn connect(config: CatalogueConfig) -> IngestResult<Self> {
        let db = connect_and_migrate(&config.database_path)
            .await
            .map_err(CatalogueError::from)?;
        Ok(Self::new(db, config))
    }

    pub fn config(&self) -> &CatalogueConfig {
        &self.config
    }

    pub fn connection(&self) -> &DatabaseConnection {
        self.reconciler.store().connection()
    }

    pub async fn import_dacpac(
        &self,
        bytes: Vec<u8>,
        server_name: &str,
        database_name: &str,
        policy: ConflictPolicy,
        dry_run: bool,
    ) -> IngestResult<ImportReport> {
        let rows = preview_dacpac(bytes, server_name, database_name).await?;
        info!(
            "Read {} column(s) from dacpac for {}/{}",
            rows.len(),
            server_name,
            database_name
        );

        let result = self.reconciler.reconcile(&rows, policy, dry_run).await;
        Ok(ImportReport {
            source: ImportSource::Dacpac,
            policy,
            dry_run,
            sheet_name: None,
            rows_read: rows.len(),
            unrecognized_headers: Vec::new(),
            row_warnings: row_warnings(&rows),
            result,
        })
    }

    pub async fn import_spreadsheet(
        &self,
        bytes: Vec<u8>,
        policy: ConflictPolicy,
        dry_run: bool,
    ) -> IngestResult<ImportReport> {
        let parsed = preview_spreadsheet(bytes, &self.config.preferred_worksheet).await?;
        info!(
            "Read {} row(s) from worksheet {}",
            parsed.rows.len(),
            parsed.sheet_name.as_deref().unwrap_or("<none>")
        );

        let result = self.reconciler.reconcile(&parsed.rows, policy, dry_run).await;
        Ok(ImportReport {
            source: ImportSource::Spreadsheet,
            policy,
            dry_run,
            row_warnings: row_warnings(&parsed.rows),
            rows_read: parsed.rows.len(),
            sheet_name: parsed.sheet_name,
            unrecognized_headers: parsed.unrecognized_headers,
            result,
        })
    }
}

/// Parse a dacpac off the async runtime without touching any store
pub async fn preview_dacpac(
    bytes: Vec<u8>,
    server_name: &str,
    database_name: &str,
) -> IngestResult<Vec<RowDescriptor>> {
    let server_name = server_name.to_string();
    let database_name = database_name.to_string();
    task::spawn_blocking(move || parse_dacpac(&bytes, &server_name, &database_name)).await?
}

/// Parse a workbook off the async runtime without touching any store
pub async fn preview_spreadsheet(
    bytes: Vec<u8>,
    preferred_sheet: &str,
) -> IngestResult<SpreadsheetImport> {
    let preferred_sheet = preferred_sheet.to_string();
    task::spawn_blocking(move || spreadsheet::parse_spreadsheet_with_sheet(&bytes, &preferred_sheet))
        .await?
}

fn row_warnings(rows: &[RowDescriptor]) -> Vec<String> {
    rows.iter()
        .filter(|row| !row.is_reconcilable())
        .map(|row| {
            format!(
                "{}.{}.{}: {}",
                row.schema_name,
                row.table_name,
                row.column_name,
                row.warning.as_deref().unwrap_or("Column name is empty")
            )
        })
        .collect()
}
