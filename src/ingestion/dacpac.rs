//! Schema-model package (dacpac) parser.
//!
//! A package is a zip container with a structural `model.xml` document. Tables
//! and columns are `Element` nodes discriminated by their `Type` attribute and
//! named by bracket-delimited, dot-qualified identifiers such as
//! `[dbo].[Orders].[OrderId]`.

use std::collections::HashMap;
use std::io::{Cursor, Read};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader as XmlReader;
use tracing::debug;
use zip::read::ZipArchive;

use crate::errors::{ImportError, IngestResult};
use crate::ingestion::RowDescriptor;

/// Locations of the model document inside the package, in lookup order
pub const MODEL_DOCUMENT_CANDIDATES: [&str; 2] = ["model.xml", "Model/model.xml"];

/// Element discriminators this parser understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ModelElementKind {
    Table,
    SimpleColumn,
}

impl ModelElementKind {
    fn from_type(discriminator: &str) -> Option<Self> {
        match discriminator {
            "SqlTable" => Some(Self::Table),
            "SqlSimpleColumn" => Some(Self::SimpleColumn),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct ModelElement {
    kind: ModelElementKind,
    name: String,
}

/// Parse a dacpac into row descriptors, one per simple column, in document order.
///
/// Fails with [`ImportError::ModelDocumentMissing`] when neither candidate
/// location exists. A model that declares no columns is a valid, empty result.
pub fn parse_dacpac(
    bytes: &[u8],
    server_name: &str,
    database_name: &str,
) -> IngestResult<Vec<RowDescriptor>> {
    let xml = read_model_document(bytes)?;
    let elements = scan_model_elements(&xml)?;

    let mut tables: HashMap<(String, String), (String, String)> = HashMap::new();
    for element in elements
        .iter()
        .filter(|e| e.kind == ModelElementKind::Table)
    {
        let segments = split_identifier(&element.name);
        if let [schema, table] = segments.as_slice() {
            tables
                .entry(lookup_key(schema, table))
                .or_insert_with(|| (schema.clone(), table.clone()));
        } else {
            debug!("Ignoring table element with unexpected name '{}'", element.name);
        }
    }

    let mut rows = Vec::new();
    for element in elements
        .iter()
        .filter(|e| e.kind == ModelElementKind::SimpleColumn)
    {
        let segments = split_identifier(&element.name);
        let [schema, table, column] = segments.as_slice() else {
            debug!("Ignoring column element with unexpected name '{}'", element.name);
            continue;
        };

        // Columns whose owning table was never declared are skipped, not fatal
        let Some((schema_name, table_name)) = tables.get(&lookup_key(schema, table)) else {
            debug!("Column '{}' has no registered owning table", element.name);
            continue;
        };

        rows.push(RowDescriptor::new(
            server_name,
            database_name,
            schema_name.as_str(),
            table_name.as_str(),
            column.as_str(),
        ));
    }

    debug!(
        "Parsed dacpac: {} table(s), {} column row(s)",
        tables.len(),
        rows.len()
    );
    Ok(rows)
}

fn read_model_document(bytes: &[u8]) -> IngestResult<String> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let entry_name = MODEL_DOCUMENT_CANDIDATES.iter().find_map(|candidate| {
        archive
            .file_names()
            .find(|name| name.eq_ignore_ascii_case(candidate))
            .map(str::to_string)
    });

    let Some(entry_name) = entry_name else {
        return Err(ImportError::ModelDocumentMissing {
            candidates: MODEL_DOCUMENT_CANDIDATES
                .iter()
                .map(|c| c.to_string())
                .collect(),
        });
    };

    let mut xml = String::new();
    archive.by_name(&entry_name)?.read_to_string(&mut xml)?;

    Ok(match xml.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => xml,
    })
}

fn scan_model_elements(xml: &str) -> IngestResult<Vec<ModelElement>> {
    let mut reader = XmlReader::from_str(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut elements = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) | Event::Empty(ref e) => {
                if let Some(element) = model_element(e, &reader)? {
                    elements.push(element);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(elements)
}

fn model_element(
    start: &BytesStart<'_>,
    reader: &XmlReader<&[u8]>,
) -> IngestResult<Option<ModelElement>> {
    if start.local_name().as_ref() != b"Element" {
        return Ok(None);
    }

    let Some(type_attr) = start.try_get_attribute("Type")? else {
        return Ok(None);
    };
    let discriminator = type_attr.decode_and_unescape_value(reader)?;
    let Some(kind) = ModelElementKind::from_type(&discriminator) else {
        return Ok(None);
    };
    let Some(name_attr) = start.try_get_attribute("Name")? else {
        return Ok(None);
    };

    Ok(Some(ModelElement {
        kind,
        name: name_attr.decode_and_unescape_value(reader)?.into_owned(),
    }))
}

fn lookup_key(schema: &str, table: &str) -> (String, String) {
    (schema.to_lowercase(), table.to_lowercase())
}

/// Split a dot-qualified identifier, stripping `[...]` and `"..."` delimiters.
///
/// Dots inside a delimited segment do not split it; `]]` and `""` are the
/// escaped closing delimiters.
pub fn split_identifier(name: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = name.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '[' | '"' => {
                let close = if c == '[' { ']' } else { '"' };
                while let Some(inner) = chars.next() {
                    if inner == close {
                        if chars.peek() == Some(&close) {
                            current.push(close);
                            chars.next();
                        } else {
                            break;
                        }
                    } else {
                        current.push(inner);
                    }
                }
            }
            '.' => segments.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    segments.push(current);

    segments
        .into_iter()
        .map(|s| s.trim().to_string())
        .collect()
}
