//! Domain-specific error types for the intent catalogue
//!
//! # Error Categories
//!
//! - **ImportError**: fatal structural failures while reading an import source
//!   (unreadable archive, missing model document, unreadable workbook)
//! - **CatalogueError**: catalogue store failures (database, uniqueness conflicts)
//!
//! Row-level problems are never errors. They travel as warnings on the parsed
//! rows so a preview can show them before anything is committed.
//!
//! # Examples
//!
//! ```rust
//! use intent_catalogue::errors::ImportError;
//!
//! let err = ImportError::ModelDocumentMissing {
//!     candidates: vec!["model.xml".to_string()],
//! };
//! assert!(err.is_client_error());
//! assert_eq!(err.error_code(), "MODEL_DOCUMENT_MISSING");
//! ```

pub mod catalogue;
pub mod import;

pub use catalogue::CatalogueError;
pub use import::ImportError;

/// Result type alias for parsing and import orchestration
pub type IngestResult<T> = Result<T, ImportError>;

/// Result type alias for catalogue store operations
pub type CatalogueResult<T> = Result<T, CatalogueError>;
