//! Import sources for the catalogue.
//!
//! Both parsers turn raw file bytes into a flat, ordered sequence of
//! [`RowDescriptor`]s. The reconciliation engine only ever sees row
//! descriptors, never the files themselves.

pub mod dacpac;
pub mod spreadsheet;

use serde::{Deserialize, Serialize};

pub use dacpac::parse_dacpac;
pub use spreadsheet::{parse_spreadsheet, SpreadsheetImport};

/// How a column's data is persisted downstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PersistenceKind {
    #[default]
    #[serde(rename = "R")]
    Relational,
    #[serde(rename = "D")]
    Document,
}

impl PersistenceKind {
    /// Database string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Relational => "R",
            Self::Document => "D",
        }
    }

    /// Parse from the single-character code. Unknown codes yield `None`.
    pub fn from_code(code: char) -> Option<Self> {
        match code.to_ascii_uppercase() {
            'R' => Some(Self::Relational),
            'D' => Some(Self::Document),
            _ => None,
        }
    }

    /// Parse a stored value, falling back to relational for anything unexpected
    pub fn from_stored(value: &str) -> Self {
        value
            .chars()
            .next()
            .and_then(Self::from_code)
            .unwrap_or_default()
    }
}

impl From<PersistenceKind> for String {
    fn from(kind: PersistenceKind) -> Self {
        kind.as_str().to_string()
    }
}

/// One prospective column together with its owning path and intent flags
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RowDescriptor {
    pub server_name: String,
    pub database_name: String,
    pub schema_name: String,
    pub table_name: String,
    pub column_name: String,
    pub persistence_kind: PersistenceKind,
    pub in_analysis: bool,
    pub in_api_scope: bool,
    pub selected_for_load: bool,
    pub estimated_row_count: Option<i64>,
    /// Rows carrying a warning are kept for review but never reconciled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl RowDescriptor {
    /// A row with default intent flags, as produced for schema-model columns
    pub fn new(
        server_name: impl Into<String>,
        database_name: impl Into<String>,
        schema_name: impl Into<String>,
        table_name: impl Into<String>,
        column_name: impl Into<String>,
    ) -> Self {
        Self {
            server_name: server_name.into(),
            database_name: database_name.into(),
            schema_name: schema_name.into(),
            table_name: table_name.into(),
            column_name: column_name.into(),
            ..Default::default()
        }
    }

    pub fn has_warning(&self) -> bool {
        self.warning.as_deref().is_some_and(|w| !w.is_empty())
    }

    /// True when the row takes part in reconciliation
    pub fn is_reconcilable(&self) -> bool {
        !self.has_warning() && !self.column_name.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persistence_kind_codes() {
        assert_eq!(PersistenceKind::from_code('d'), Some(PersistenceKind::Document));
        assert_eq!(PersistenceKind::from_code('R'), Some(PersistenceKind::Relational));
        assert_eq!(PersistenceKind::from_code('X'), None);
        assert_eq!(PersistenceKind::from_stored("D"), PersistenceKind::Document);
        assert_eq!(PersistenceKind::from_stored(""), PersistenceKind::Relational);
        assert_eq!(String::from(PersistenceKind::Document), "D");
    }

    #[test]
    fn test_reconcilable_rows() {
        let row = RowDescriptor::new("srv", "db", "dbo", "Orders", "Id");
        assert!(row.is_reconcilable());

        let blank = RowDescriptor::new("srv", "db", "dbo", "Orders", "  ");
        assert!(!blank.is_reconcilable());

        let warned = RowDescriptor {
            warning: Some("Column name is empty".to_string()),
            ..row.clone()
        };
        assert!(!warned.is_reconcilable());

        let empty_warning = RowDescriptor {
            warning: Some(String::new()),
            ..row
        };
        assert!(empty_warning.is_reconcilable());
    }
}
