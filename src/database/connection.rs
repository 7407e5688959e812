use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use std::time::Duration;

use crate::database::migrations::Migrator;

pub async fn establish_connection(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(database_url);

    // One connection serializes unit transactions on a shared in-memory database
    let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

    opt.max_connections(max_connections)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(5))
        .acquire_timeout(Duration::from_secs(5))
        .sqlx_logging(true)
        .sqlx_logging_level(tracing::log::LevelFilter::Debug);

    Database::connect(opt).await
}

pub fn get_database_url(database_path: Option<&str>) -> String {
    match database_path {
        Some(":memory:") => "sqlite::memory:".to_string(),
        Some(path) => format!("sqlite://{}?mode=rwc", path),
        None => "sqlite://intent-catalogue.db?mode=rwc".to_string(),
    }
}

/// Connect and bring the schema up to date
pub async fn connect_and_migrate(database_path: &str) -> Result<DatabaseConnection, DbErr> {
    let db = establish_connection(&get_database_url(Some(database_path))).await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}
