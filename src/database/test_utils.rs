#[cfg(test)]
use sea_orm::DatabaseConnection;

/// In-memory catalogue with the schema applied, pinned to a single connection
#[cfg(test)]
pub async fn setup_test_db() -> DatabaseConnection {
    use sea_orm_migration::MigratorTrait;

    let db = super::establish_connection(&super::get_database_url(Some(":memory:")))
        .await
        .expect("Failed to connect to test database");

    crate::database::migrations::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}
