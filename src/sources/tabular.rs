//! CSV loader: one document per row, serialised as `column: value` pairs.

use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};

use crate::error::LoaderError;
use crate::models::{DocumentKind, SourceDocument};
use crate::sources::DocumentLoader;
use crate::utils::{has_extension, source_id};

/// Placeholder written for missing cells.
pub const MISSING_VALUE: &str = "N/A";

/// Cell values read as missing, matching the usual pandas NA markers.
const NA_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Whether a raw cell value counts as missing.
pub fn is_missing_value(cell: &str) -> bool {
    NA_MARKERS.contains(&cell.trim())
}

#[derive(Debug, Default)]
pub struct CsvLoader;

impl CsvLoader {
    pub fn new() -> Self {
        Self
    }

    /// Column names in declaration order; blank names become `Unnamed: {i}`.
    fn column_names(headers: &StringRecord) -> Vec<String> {
        headers
            .iter()
            .enumerate()
            .map(|(i, name)| {
                if name.is_empty() {
                    format!("Unnamed: {}", i)
                } else {
                    name.to_string()
                }
            })
            .collect()
    }

    /// Render a row as `"col: value, col: value"`. Absent and NA cells become [`MISSING_VALUE`].
    pub fn serialize_row(columns: &[String], record: &StringRecord) -> String {
        columns
            .iter()
            .enumerate()
            .map(|(i, column)| {
                let value = match record.get(i) {
                    Some(cell) if !is_missing_value(cell) => cell,
                    _ => MISSING_VALUE,
                };
                format!("{}: {}", column, value)
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl DocumentLoader for CsvLoader {
    fn kind(&self) -> DocumentKind {
        DocumentKind::CsvRow
    }

    fn name(&self) -> &str {
        "CSV"
    }

    fn accepts(&self, path: &Path) -> bool {
        has_extension(path, &["csv"])
    }

    fn load(&self, path: &Path) -> Result<Vec<SourceDocument>, LoaderError> {
        let mut reader = ReaderBuilder::new()
            .flexible(true)
            .trim(Trim::All)
            .from_path(path)?;

        let headers = reader.headers()?.clone();
        if headers.is_empty() {
            return Err(LoaderError::NoColumns(path.display().to_string()));
        }
        let columns = Self::column_names(&headers);
        let source = source_id(path);

        // Collect first: any malformed row fails the whole file.
        let records = reader.records().collect::<Result<Vec<_>, _>>()?;

        let documents = records
            .iter()
            .enumerate()
            .map(|(row, record)| {
                if record.len() > columns.len() {
                    tracing::debug!(
                        file = %source,
                        row,
                        extra = record.len() - columns.len(),
                        "ignoring cells beyond the header"
                    );
                }
                SourceDocument::new(
                    Self::serialize_row(&columns, record),
                    source.clone(),
                    DocumentKind::CsvRow,
                )
                .with_metadata("row", row)
                .with_metadata("path", path.display())
            })
            .collect();

        Ok(documents)
    }
}
