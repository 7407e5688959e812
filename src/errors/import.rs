//! Import error types
//!
//! Structural failures that abort an import before any reconciliation
//! happens. A caller can always tell these apart from a successful import
//! that produced zero rows.

use thiserror::Error;

use super::CatalogueError;

/// Fatal import errors
#[derive(Error, Debug)]
pub enum ImportError {
    /// The schema-model package is not a readable zip container
    #[error("Archive is unreadable: {0}")]
    ArchiveUnreadable(#[from] zip::result::ZipError),

    /// None of the known model document locations exist in the package
    #[error("Model document not found in archive (looked for: {})", candidates.join(", "))]
    ModelDocumentMissing { candidates: Vec<String> },

    /// The model document is not well-formed XML
    #[error("Malformed model document: {0}")]
    MalformedModel(#[from] quick_xml::Error),

    /// The model document could not be read out of the archive
    #[error("Failed to read model document: {0}")]
    Io(#[from] std::io::Error),

    /// The workbook container cannot be opened
    #[error("Workbook is unreadable: {0}")]
    WorkbookUnreadable(String),

    /// The blocking parser task panicked or was cancelled
    #[error("Parser task failed: {0}")]
    ParserTask(#[from] tokio::task::JoinError),

    /// Catalogue store failure outside of a reconciliation unit
    #[error("Catalogue store error: {0}")]
    Store(#[from] CatalogueError),
}

impl From<quick_xml::events::attributes::AttrError> for ImportError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        ImportError::MalformedModel(err.into())
    }
}

impl ImportError {
    /// Check if the failure is caused by the submitted file rather than the system
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ImportError::ArchiveUnreadable(_)
                | ImportError::ModelDocumentMissing { .. }
                | ImportError::MalformedModel(_)
                | ImportError::WorkbookUnreadable(_)
        )
    }

    /// Get error code for API responses and CLI output
    pub fn error_code(&self) -> &'static str {
        match self {
            ImportError::ArchiveUnreadable(_) => "ARCHIVE_UNREADABLE",
            ImportError::ModelDocumentMissing { .. } => "MODEL_DOCUMENT_MISSING",
            ImportError::MalformedModel(_) => "MALFORMED_MODEL",
            ImportError::Io(_) => "IO_ERROR",
            ImportError::WorkbookUnreadable(_) => "WORKBOOK_UNREADABLE",
            ImportError::ParserTask(_) => "PARSER_TASK_FAILED",
            ImportError::Store(_) => "STORE_ERROR",
        }
    }
}
