//! Legacy column-intent spreadsheet parser.
//!
//! Reads the "All" worksheet (or the first sheet) of a workbook, maps header
//! labels through a fixed synonym table and coerces each data row into a
//! [`RowDescriptor`]. Only an unreadable workbook is fatal; every other
//! problem becomes a row warning or an unrecognized header.

use std::collections::HashMap;
use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use once_cell::sync::Lazy;
use serde::Serialize;
use tracing::{debug, warn};

use crate::errors::{ImportError, IngestResult};
use crate::ingestion::{PersistenceKind, RowDescriptor};

/// Worksheet read when present; otherwise the first sheet is used
pub const DEFAULT_WORKSHEET: &str = "All";

/// Row-descriptor fields a header can map to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpreadsheetField {
    Server,
    Database,
    Schema,
    Table,
    Column,
    PersistenceKind,
    DevPersistenceKind,
    InAnalysis,
    InApiScope,
    SelectedForLoad,
    RowCount,
}

/// Header synonyms understood by the legacy workbook layout
static HEADER_SYNONYMS: &[(&str, SpreadsheetField)] = &[
    ("Server", SpreadsheetField::Server),
    ("Server Name", SpreadsheetField::Server),
    ("Database", SpreadsheetField::Database),
    ("Database Name", SpreadsheetField::Database),
    ("DB", SpreadsheetField::Database),
    ("Schema", SpreadsheetField::Schema),
    ("Schema Name", SpreadsheetField::Schema),
    ("Table", SpreadsheetField::Table),
    ("Table Name", SpreadsheetField::Table),
    ("Column", SpreadsheetField::Column),
    ("Column Name", SpreadsheetField::Column),
    ("Persistence Type", SpreadsheetField::PersistenceKind),
    ("Persistence", SpreadsheetField::PersistenceKind),
    ("Dev Persistence Type", SpreadsheetField::DevPersistenceKind),
    ("Development Persistence Type", SpreadsheetField::DevPersistenceKind),
    ("In Analysis", SpreadsheetField::InAnalysis),
    ("Analysis", SpreadsheetField::InAnalysis),
    ("Added by API", SpreadsheetField::InApiScope),
    ("In API Scope", SpreadsheetField::InApiScope),
    ("API", SpreadsheetField::InApiScope),
    ("Generate SQL INSERTS", SpreadsheetField::SelectedForLoad),
    ("Selected for Load", SpreadsheetField::SelectedForLoad),
    ("Load", SpreadsheetField::SelectedForLoad),
    ("Row Count", SpreadsheetField::RowCount),
    ("Rows", SpreadsheetField::RowCount),
    ("Estimated Row Count", SpreadsheetField::RowCount),
];

static HEADER_INDEX: Lazy<HashMap<String, SpreadsheetField>> = Lazy::new(|| {
    HEADER_SYNONYMS
        .iter()
        .map(|(label, field)| (label.to_lowercase(), *field))
        .collect()
});

/// Resolve a header label (case-insensitive, surrounding whitespace ignored)
pub fn map_header(label: &str) -> Option<SpreadsheetField> {
    HEADER_INDEX.get(&label.trim().to_lowercase()).copied()
}

/// Parsed workbook contents
#[derive(Debug, Clone, Default, Serialize)]
pub struct SpreadsheetImport {
    /// Worksheet the rows were read from; `None` for a workbook without sheets
    pub sheet_name: Option<String>,
    pub rows: Vec<RowDescriptor>,
    pub unrecognized_headers: Vec<String>,
}

/// Parse a workbook using the default "All" worksheet preference
pub fn parse_spreadsheet(bytes: &[u8]) -> IngestResult<SpreadsheetImport> {
    parse_spreadsheet_with_sheet(bytes, DEFAULT_WORKSHEET)
}

/// Parse a workbook, reading `preferred_sheet` (case-insensitive) when present
pub fn parse_spreadsheet_with_sheet(
    bytes: &[u8],
    preferred_sheet: &str,
) -> IngestResult<SpreadsheetImport> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(|err| {
        ImportError::WorkbookUnreadable(format!("{} ({} bytes)", err, bytes.len()))
    })?;

    let Some(sheet_name) = select_worksheet(&workbook.sheet_names(), preferred_sheet) else {
        debug!("Workbook has no worksheets");
        return Ok(SpreadsheetImport::default());
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|err| ImportError::WorkbookUnreadable(err.to_string()))?;

    let mut import = parse_range(&range);
    import.sheet_name = Some(sheet_name);
    Ok(import)
}

/// The preferred sheet (case-insensitive), else the first one; `None` without sheets
fn select_worksheet(sheet_names: &[String], preferred_sheet: &str) -> Option<String> {
    sheet_names
        .iter()
        .find(|name| name.eq_ignore_ascii_case(preferred_sheet))
        .or_else(|| sheet_names.first())
        .cloned()
}

fn parse_range(range: &Range<Data>) -> SpreadsheetImport {
    let mut import = SpreadsheetImport::default();
    let mut rows = range.rows().filter(|row| !is_blank_row(row));

    let Some(header_row) = rows.next() else {
        return import;
    };

    let mut columns: Vec<Option<SpreadsheetField>> = Vec::with_capacity(header_row.len());
    for cell in header_row {
        let label = cell_text(cell);
        let field = map_header(&label);
        if field.is_none() && !label.trim().is_empty() {
            warn!("Unrecognized spreadsheet header '{}'", label.trim());
            import.unrecognized_headers.push(label.trim().to_string());
        }
        columns.push(field);
    }

    for row in rows {
        import.rows.push(parse_row(&columns, row));
    }

    import
}

fn parse_row(columns: &[Option<SpreadsheetField>], cells: &[Data]) -> RowDescriptor {
    let mut row = RowDescriptor::default();
    let mut dev_persistence: Option<PersistenceKind> = None;

    for (field, cell) in columns.iter().zip(cells) {
        let Some(field) = field else { continue };
        let text = cell_text(cell);
        let text = text.trim();

        match field {
            SpreadsheetField::Server => row.server_name = text.to_string(),
            SpreadsheetField::Database => row.database_name = text.to_string(),
            SpreadsheetField::Schema => row.schema_name = text.to_string(),
            SpreadsheetField::Table => row.table_name = text.to_string(),
            SpreadsheetField::Column => row.column_name = text.to_string(),
            SpreadsheetField::PersistenceKind => row.persistence_kind = parse_persistence(text),
            SpreadsheetField::DevPersistenceKind => {
                if !text.is_empty() {
                    dev_persistence = Some(parse_persistence(text));
                }
            }
            SpreadsheetField::InAnalysis => row.in_analysis = parse_flag(text),
            SpreadsheetField::InApiScope => row.in_api_scope = parse_flag(text),
            SpreadsheetField::SelectedForLoad => row.selected_for_load = parse_flag(text),
            SpreadsheetField::RowCount => row.estimated_row_count = parse_row_count(text),
        }
    }

    // A non-empty development persistence type wins over the primary one
    if let Some(dev) = dev_persistence {
        if dev != row.persistence_kind {
            row.persistence_kind = dev;
        }
    }

    row.warning = row_warning(&row);
    row
}

fn row_warning(row: &RowDescriptor) -> Option<String> {
    if row.column_name.is_empty() {
        Some("Column name is empty".to_string())
    } else if row.table_name.is_empty() {
        Some("Table name is empty".to_string())
    } else if row.server_name.is_empty() || row.database_name.is_empty() {
        Some("Server or database name is empty".to_string())
    } else {
        None
    }
}

/// `true`, `1`, `yes` and `y` (any case) are true; everything else is false
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "1" | "yes" | "y"
    )
}

/// Integer after removing thousands separators and whitespace; unparsable is `None`
pub fn parse_row_count(value: &str) -> Option<i64> {
    let cleaned: String = value
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<i64>().ok()
}

/// Upper-cased first character; empty or unknown codes fall back to relational
pub fn parse_persistence(value: &str) -> PersistenceKind {
    value
        .trim()
        .chars()
        .next()
        .and_then(PersistenceKind::from_code)
        .unwrap_or_default()
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn is_blank_row(cells: &[Data]) -> bool {
    cells.iter().all(|cell| cell_text(cell).trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    fn workbook(sheets: &[(&str, &[&[&str]])]) -> Vec<u8> {
        let mut workbook = Workbook::new();
        for (name, rows) in sheets {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(*name).unwrap();
            for (r, row) in rows.iter().enumerate() {
                for (c, value) in row.iter().enumerate() {
                    if !value.is_empty() {
                        worksheet.write_string(r as u32, c as u16, *value).unwrap();
                    }
                }
            }
        }
        workbook.save_to_buffer().unwrap()
    }

    const HEADERS: &[&str] = &[
        "Server Name",
        "Database",
        "Schema",
        "Table",
        "Column Name",
        "Persistence Type",
        "In Analysis",
        "Added by API",
        "Generate SQL INSERTS",
        "Row Count",
    ];

    #[test]
    fn test_flag_coercion() {
        for truthy in ["true", "TRUE", "1", "Yes", "yes", "Y", "y", " True "] {
            assert!(parse_flag(truthy), "{truthy} should be true");
        }
        for falsy in ["false", "0", "No", "n", "", "maybe"] {
            assert!(!parse_flag(falsy), "{falsy} should be false");
        }
    }

    #[test]
    fn test_row_count_coercion() {
        assert_eq!(parse_row_count("1,234,567"), Some(1_234_567));
        assert_eq!(parse_row_count(" 42 "), Some(42));
        assert_eq!(parse_row_count("1 000"), Some(1000));
        assert_eq!(parse_row_count("lots"), None);
        assert_eq!(parse_row_count(""), None);
    }

    #[test]
    fn test_persistence_coercion() {
        assert_eq!(parse_persistence(""), PersistenceKind::Relational);
        assert_eq!(parse_persistence("document"), PersistenceKind::Document);
        assert_eq!(parse_persistence("R"), PersistenceKind::Relational);
        assert_eq!(parse_persistence("Xml"), PersistenceKind::Relational);
    }

    #[test]
    fn test_header_synonyms() {
        assert_eq!(map_header("Server"), Some(SpreadsheetField::Server));
        assert_eq!(map_header(" server name "), Some(SpreadsheetField::Server));
        assert_eq!(
            map_header("Generate SQL INSERTS"),
            Some(SpreadsheetField::SelectedForLoad)
        );
        assert_eq!(map_header("Notes"), None);
    }

    #[test]
    fn test_parses_all_sheet() {
        let bytes = workbook(&[
            ("Summary", &[&["ignored"]]),
            (
                "all",
                &[
                    HEADERS,
                    &["SQL01", "Sales", "dbo", "Orders", "OrderId", "", "yes", "0", "TRUE", "12,500"],
                    &["SQL01", "Sales", "dbo", "Orders", "Payload", "d", "N", "Y", "false", "n/a"],
                ],
            ),
        ]);

        let import = parse_spreadsheet(&bytes).unwrap();
        assert_eq!(import.sheet_name.as_deref(), Some("all"));
        assert!(import.unrecognized_headers.is_empty());
        assert_eq!(import.rows.len(), 2);

        let first = &import.rows[0];
        assert_eq!(first.server_name, "SQL01");
        assert_eq!(first.column_name, "OrderId");
        assert_eq!(first.persistence_kind, PersistenceKind::Relational);
        assert!(first.in_analysis);
        assert!(!first.in_api_scope);
        assert!(first.selected_for_load);
        assert_eq!(first.estimated_row_count, Some(12_500));
        assert!(first.warning.is_none());

        let second = &import.rows[1];
        assert_eq!(second.persistence_kind, PersistenceKind::Document);
        assert!(!second.in_analysis);
        assert!(second.in_api_scope);
        assert!(!second.selected_for_load);
        assert_eq!(second.estimated_row_count, None);
    }

    #[test]
    fn test_falls_back_to_first_sheet_and_reports_unknown_headers() {
        let bytes = workbook(&[
            (
                "Columns",
                &[
                    &["Server", "Database", "Schema", "Table", "Column", "Owner", "Notes"],
                    &["SQL01", "Sales", "dbo", "Orders", "OrderId", "jane", "pk"],
                ],
            ),
            ("Other", &[&["Server"]]),
        ]);

        let import = parse_spreadsheet(&bytes).unwrap();
        assert_eq!(import.sheet_name.as_deref(), Some("Columns"));
        assert_eq!(import.unrecognized_headers, vec!["Owner", "Notes"]);
        assert_eq!(import.rows.len(), 1);
        assert_eq!(import.rows[0].table_name, "Orders");
    }

    #[test]
    fn test_dev_persistence_overrides_primary() {
        let bytes = workbook(&[(
            "All",
            &[
                &["Server", "Database", "Schema", "Table", "Column", "Persistence Type", "Development Persistence Type"],
                &["S", "D", "dbo", "T", "A", "R", "D"],
                &["S", "D", "dbo", "T", "B", "D", ""],
                &["S", "D", "dbo", "T", "C", "D", "R"],
            ],
        )]);

        let rows = parse_spreadsheet(&bytes).unwrap().rows;
        assert_eq!(rows[0].persistence_kind, PersistenceKind::Document);
        assert_eq!(rows[1].persistence_kind, PersistenceKind::Document);
        assert_eq!(rows[2].persistence_kind, PersistenceKind::Relational);
    }

    #[test]
    fn test_empty_column_name_gets_warning() {
        let bytes = workbook(&[(
            "All",
            &[
                &["Server", "Database", "Schema", "Table", "Column"],
                &["S", "D", "dbo", "T", ""],
                &["", "", "", "", ""],
                &["S", "D", "dbo", "T", "Name"],
            ],
        )]);

        let rows = parse_spreadsheet(&bytes).unwrap().rows;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].warning.as_deref(), Some("Column name is empty"));
        assert!(!rows[0].is_reconcilable());
        assert!(rows[1].is_reconcilable());
    }

    #[test]
    fn test_incomplete_owning_path_gets_warning() {
        let bytes = workbook(&[(
            "All",
            &[
                &["Server", "Database", "Schema", "Table", "Column"],
                &["S", "D", "dbo", "", "Id"],
                &["", "D", "dbo", "T", "Id"],
                &["S", "", "dbo", "T", "Id"],
                &["S", "D", "", "T", "Id"],
            ],
        )]);

        let rows = parse_spreadsheet(&bytes).unwrap().rows;
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].warning.as_deref(), Some("Table name is empty"));
        assert_eq!(
            rows[1].warning.as_deref(),
            Some("Server or database name is empty")
        );
        assert_eq!(
            rows[2].warning.as_deref(),
            Some("Server or database name is empty")
        );
        assert!(rows[..3].iter().all(|row| !row.is_reconcilable()));
        // An empty schema is a legitimate default-schema path
        assert!(rows[3].is_reconcilable());
    }

    #[test]
    fn test_numeric_and_boolean_cells() {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("All").unwrap();
        for (c, header) in ["Server", "Database", "Schema", "Table", "Column", "Load", "Rows"]
            .iter()
            .enumerate()
        {
            worksheet.write_string(0, c as u16, *header).unwrap();
        }
        for (c, value) in ["S", "D", "dbo", "T", "Id"].iter().enumerate() {
            worksheet.write_string(1, c as u16, *value).unwrap();
        }
        worksheet.write_boolean(1, 5, true).unwrap();
        worksheet.write_number(1, 6, 1500.0).unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let rows = parse_spreadsheet(&bytes).unwrap().rows;
        assert!(rows[0].selected_for_load);
        assert_eq!(rows[0].estimated_row_count, Some(1500));
    }

    #[test]
    fn test_empty_sheet_yields_no_rows() {
        let bytes = workbook(&[("All", &[])]);
        let import = parse_spreadsheet(&bytes).unwrap();
        assert!(import.rows.is_empty());
        assert!(import.unrecognized_headers.is_empty());
    }

    #[test]
    fn test_worksheet_selection() {
        let names = vec!["Notes".to_string(), "all".to_string()];
        assert_eq!(select_worksheet(&names, "All").as_deref(), Some("all"));
        assert_eq!(select_worksheet(&names, "Missing").as_deref(), Some("Notes"));
        assert_eq!(select_worksheet(&[], "All"), None);
    }

    #[test]
    fn test_unreadable_workbook_is_fatal() {
        let err = parse_spreadsheet(b"not a workbook").unwrap_err();
        assert!(matches!(err, ImportError::WorkbookUnreadable(_)));
    }
}
