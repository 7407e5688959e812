use std::io::{Cursor, Write};

use intent_catalogue::config::CatalogueConfig;
use intent_catalogue::database::entities::{catalogue_columns, catalogue_tables, servers};
use intent_catalogue::database::migrations::Migrator;
use intent_catalogue::errors::ImportError;
use intent_catalogue::ingestion::PersistenceKind;
use intent_catalogue::services::{ConflictPolicy, ImportService, ImportSource};
use rust_xlsxwriter::Workbook;
use sea_orm::{Database, DatabaseConnection, DbErr, EntityTrait, QueryOrder};
use sea_orm_migration::MigratorTrait;
use zip::write::FileOptions;
use zip::ZipWriter;

/// Create an in-memory SQLite database for testing
async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect("sqlite::memory:").await?;

    // Run migrations
    Migrator::up(&db, None).await?;

    Ok(db)
}

fn dacpac(columns: &[&str]) -> Vec<u8> {
    let mut body = String::from(r#"<Element Type="SqlTable" Name="[dbo].[Orders]" />"#);
    for column in columns {
        body.push_str(&format!(
            r#"<Element Type="SqlSimpleColumn" Name="[dbo].[Orders].[{}]" />"#,
            column
        ));
    }
    let xml = format!(
        r#"<?xml version="1.0" encoding="utf-8"?><DataSchemaModel xmlns="http://schemas.microsoft.com/sqlserver/dac/Serialization/2012/02"><Model>{}</Model></DataSchemaModel>"#,
        body
    );

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    writer.start_file("Origin.xml", FileOptions::default()).unwrap();
    writer.write_all(b"<DacOrigin />").unwrap();
    writer.start_file("model.xml", FileOptions::default()).unwrap();
    writer.write_all(xml.as_bytes()).unwrap();
    writer.finish().unwrap().into_inner()
}

fn workbook(rows: &[&[&str]]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let notes = workbook.add_worksheet();
    notes.set_name("Notes").unwrap();
    notes.write_string(0, 0, "Ignored").unwrap();

    let worksheet = workbook.add_worksheet();
    worksheet.set_name("All").unwrap();
    let headers = [
        "Server Name",
        "Database",
        "Schema",
        "Table",
        "Column",
        "Persistence Type",
        "In Analysis",
        "Added by API",
        "Generate SQL INSERTS",
        "Row Count",
        "Owner",
    ];
    for (c, header) in headers.iter().enumerate() {
        worksheet.write_string(0, c as u16, *header).unwrap();
    }
    for (r, row) in rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            if !value.is_empty() {
                worksheet
                    .write_string(r as u32 + 1, c as u16, *value)
                    .unwrap();
            }
        }
    }
    workbook.save_to_buffer().unwrap()
}

async fn column_names(db: &DatabaseConnection) -> Vec<String> {
    catalogue_columns::Entity::find()
        .order_by_asc(catalogue_columns::Column::SortOrder)
        .all(db)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect()
}

#[tokio::test]
async fn test_dacpac_import_then_full_sync() {
    let db = setup_test_db().await.unwrap();
    let service = ImportService::new(db, CatalogueConfig::default());

    let report = service
        .import_dacpac(
            dacpac(&["OrderId", "Customer", "Legacy"]),
            "SQL01",
            "Sales",
            ConflictPolicy::AddNewOnly,
            false,
        )
        .await
        .unwrap();
    assert_eq!(report.source, ImportSource::Dacpac);
    assert_eq!(report.rows_read, 3);
    assert_eq!(report.result.tables_added, 1);
    assert_eq!(report.result.columns_added, 3);

    let report = service
        .import_dacpac(
            dacpac(&["OrderId", "Customer", "PlacedAt"]),
            "SQL01",
            "Sales",
            ConflictPolicy::FullSync,
            false,
        )
        .await
        .unwrap();
    assert_eq!(report.result.tables_added, 0);
    assert_eq!(report.result.columns_added, 1);
    assert_eq!(report.result.columns_updated, 2);
    assert_eq!(report.result.columns_removed, 1);

    let db = service.connection();
    assert_eq!(
        column_names(db).await,
        vec!["OrderId", "Customer", "PlacedAt"]
    );
    let placed_at = catalogue_columns::Entity::find()
        .all(db)
        .await
        .unwrap()
        .into_iter()
        .find(|c| c.name == "PlacedAt")
        .unwrap();
    assert_eq!(placed_at.sort_order, 40);
}

#[tokio::test]
async fn test_dacpac_dry_run_previews_without_writing() {
    let db = setup_test_db().await.unwrap();
    let service = ImportService::new(db, CatalogueConfig::default());

    let preview = service
        .import_dacpac(
            dacpac(&["OrderId", "Customer"]),
            "SQL01",
            "Sales",
            ConflictPolicy::AddNewOnly,
            true,
        )
        .await
        .unwrap();
    assert!(preview.dry_run);
    assert_eq!(preview.result.tables_added, 1);
    assert_eq!(preview.result.columns_added, 2);

    let stored_servers = servers::Entity::find()
        .all(service.connection())
        .await
        .unwrap();
    assert!(stored_servers.is_empty());

    let committed = service
        .import_dacpac(
            dacpac(&["OrderId", "Customer"]),
            "SQL01",
            "Sales",
            ConflictPolicy::AddNewOnly,
            false,
        )
        .await
        .unwrap();
    assert_eq!(preview.result, committed.result);
}

#[tokio::test]
async fn test_dacpac_without_model_document_fails() {
    let db = setup_test_db().await.unwrap();
    let service = ImportService::new(db, CatalogueConfig::default());

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    writer.start_file("Origin.xml", FileOptions::default()).unwrap();
    writer.write_all(b"<DacOrigin />").unwrap();
    let bytes = writer.finish().unwrap().into_inner();

    let err = service
        .import_dacpac(bytes, "SQL01", "Sales", ConflictPolicy::AddNewOnly, false)
        .await
        .unwrap_err();
    assert!(matches!(err, ImportError::ModelDocumentMissing { .. }));
}

#[tokio::test]
async fn test_spreadsheet_import_applies_intent() {
    let db = setup_test_db().await.unwrap();
    let service = ImportService::new(db, CatalogueConfig::default());

    let bytes = workbook(&[
        &["SQL01", "Sales", "dbo", "Orders", "Id", "R", "yes", "", "", "12000", "ops"],
        &["SQL01", "Sales", "dbo", "Orders", "Payload", "D", "", "1", "true", "", ""],
        &["SQL01", "Sales", "dbo", "Orders", "", "R", "", "", "", "", ""],
        &["", "Sales", "dbo", "Orders", "Orphan", "R", "", "", "", "", ""],
    ]);

    let report = service
        .import_spreadsheet(bytes, ConflictPolicy::AddNewOnly, false)
        .await
        .unwrap();
    assert_eq!(report.source, ImportSource::Spreadsheet);
    assert_eq!(report.sheet_name.as_deref(), Some("All"));
    assert_eq!(report.rows_read, 4);
    assert_eq!(report.unrecognized_headers, vec!["Owner"]);
    assert_eq!(report.row_warnings.len(), 2);
    assert_eq!(report.result.rows_with_warnings, 2);
    assert_eq!(report.result.columns_added, 2);
    assert!(report.result.errors.is_empty());

    let db = service.connection();
    let columns = catalogue_columns::Entity::find()
        .order_by_asc(catalogue_columns::Column::SortOrder)
        .all(db)
        .await
        .unwrap();
    assert_eq!(columns.len(), 2);
    assert!(columns[0].in_analysis);
    assert_eq!(columns[0].persistence(), PersistenceKind::Relational);
    assert_eq!(columns[1].persistence(), PersistenceKind::Document);
    assert!(columns[1].in_api_scope);
    assert!(columns[1].selected_for_load);

    let tables = catalogue_tables::Entity::find().all(db).await.unwrap();
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].estimated_row_count, Some(12_000));
}

#[tokio::test]
async fn test_skip_existing_spreadsheet_leaves_intent() {
    let db = setup_test_db().await.unwrap();
    let service = ImportService::new(db, CatalogueConfig::default());

    service
        .import_spreadsheet(
            workbook(&[&["SQL01", "Sales", "dbo", "Orders", "Id", "R", "", "", "", "", ""]]),
            ConflictPolicy::AddNewOnly,
            false,
        )
        .await
        .unwrap();

    let report = service
        .import_spreadsheet(
            workbook(&[&["SQL01", "Sales", "dbo", "Orders", "id", "D", "y", "y", "y", "", ""]]),
            ConflictPolicy::SkipExisting,
            false,
        )
        .await
        .unwrap();
    assert_eq!(report.result.columns_skipped, 1);
    assert_eq!(report.result.columns_updated, 0);

    let columns = catalogue_columns::Entity::find()
        .all(service.connection())
        .await
        .unwrap();
    assert_eq!(columns.len(), 1);
    assert!(!columns[0].in_analysis);
    assert_eq!(columns[0].persistence(), PersistenceKind::Relational);
}

#[tokio::test]
async fn test_file_backed_catalogue_persists_between_connections() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalogue.db");
    let config = CatalogueConfig::default().with_database_path(path.to_string_lossy());

    let service = ImportService::connect(config.clone()).await.unwrap();
    service
        .import_dacpac(
            dacpac(&["OrderId"]),
            "SQL01",
            "Sales",
            ConflictPolicy::AddNewOnly,
            false,
        )
        .await
        .unwrap();
    drop(service);

    let service = ImportService::connect(config).await.unwrap();
    let report = service
        .import_dacpac(
            dacpac(&["OrderId"]),
            "SQL01",
            "Sales",
            ConflictPolicy::AddNewOnly,
            false,
        )
        .await
        .unwrap();
    assert_eq!(report.result.tables_added, 0);
    assert_eq!(report.result.columns_updated, 1);
    assert_eq!(column_names(service.connection()).await, vec!["OrderId"]);
}
