//! Catalogue store error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogueError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// A uniqueness invariant of the entity hierarchy would be violated
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Referenced record does not exist
    #[error("Not found: {0}")]
    NotFound(String),
}

impl CatalogueError {
    pub fn error_code(&self) -> &'static str {
        match self {
            CatalogueError::Database(_) => "DATABASE_ERROR",
            CatalogueError::Conflict(_) => "CONFLICT",
            CatalogueError::NotFound(_) => "NOT_FOUND",
        }
    }
}
