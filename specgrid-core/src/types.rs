use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

// ===== GRID TYPES =====

/// Input for the loader: either a CSV file on disk or rows that are
/// already in memory (e.g. handed over by the ingestion service).
#[derive(Debug, Clone)]
pub enum TableSource {
    Path(PathBuf),
    Rows(Vec<Vec<String>>),
}

impl From<&str> for TableSource {
    fn from(path: &str) -> Self {
        TableSource::Path(PathBuf::from(path))
    }
}

impl From<PathBuf> for TableSource {
    fn from(path: PathBuf) -> Self {
        TableSource::Path(path)
    }
}

impl From<&std::path::Path> for TableSource {
    fn from(path: &std::path::Path) -> Self {
        TableSource::Path(path.to_path_buf())
    }
}

impl From<Vec<Vec<String>>> for TableSource {
    fn from(rows: Vec<Vec<String>>) -> Self {
        TableSource::Rows(rows)
    }
}

/// The loaded spreadsheet: rows of cell strings aligned by column index.
///
/// Rows may be ragged (the CSV reader runs in flexible mode); `cell`
/// returns the empty string for any out-of-range access. The grid is
/// mutated once by the continuation-merge pass and never afterward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetGrid {
    pub rows: Vec<Vec<String>>,
    /// Leading rows that name the columns rather than carry data.
    pub header_rows: usize,
}

impl SheetGrid {
    pub fn new(rows: Vec<Vec<String>>, header_rows: usize) -> Self {
        Self { rows, header_rows }
    }

    /// Cell text at (row, col), or "" when the row is missing or too short.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(|s| s.as_str())
            .unwrap_or("")
    }

    /// Widest row width in the grid.
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(|r| r.len()).max().unwrap_or(0)
    }

    /// Header text for a column, or "" when no header row exists or the
    /// header row is too short.
    pub fn column_header(&self, col: usize) -> &str {
        if self.header_rows == 0 {
            return "";
        }
        self.cell(0, col)
    }

    /// Row indices that carry data (everything below the header rows).
    pub fn data_row_range(&self) -> std::ops::Range<usize> {
        self.header_rows.min(self.rows.len())..self.rows.len()
    }

    /// True when a keyword appears as a case-insensitive substring in at
    /// least one cell of the row. The search space is per-cell — joining
    /// cells first would let a keyword straddle a cell boundary.
    pub fn row_contains(&self, row: usize, keyword: &str) -> bool {
        let needle = keyword.to_lowercase();
        self.rows
            .get(row)
            .map(|r| r.iter().any(|cell| cell.to_lowercase().contains(&needle)))
            .unwrap_or(false)
    }
}

// ===== EXTRACTION TYPES =====

/// One candidate fact pulled out of a cell, before model attribution.
///
/// `source` is a human-readable locator ("CPU:14" — column header or
/// index, then row index); `row`/`column` carry the same location in
/// structured form for the assembler's attribution heuristic. `raw_data`
/// keeps the original cell text for audit export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRecord {
    pub category: String,
    pub field_type: String,
    pub value: String,
    pub source: String,
    pub row: usize,
    pub column: usize,
    pub raw_data: String,
}

/// One structured output row: a model plus its extracted field values.
///
/// `fields` is a BTreeMap so serialization and CSV export are always in
/// ascending lexical column order — identical input must yield
/// byte-identical output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    pub model_name: String,
    pub fields: BTreeMap<String, String>,
}

impl ModelRecord {
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Merge a value into a field, joining distinct values with "; ".
    /// A value already present (exactly) is not appended again.
    pub fn merge_field(&mut self, field: &str, value: &str) {
        if value.is_empty() {
            return;
        }
        match self.fields.get_mut(field) {
            None => {
                self.fields.insert(field.to_string(), value.to_string());
            }
            Some(existing) => {
                if !existing.split("; ").any(|part| part == value) {
                    existing.push_str("; ");
                    existing.push_str(value);
                }
            }
        }
    }
}

/// Result of one pipeline run over one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseOutput {
    /// One row per model, already cleaned.
    pub records: Vec<ModelRecord>,
    /// Raw extraction facts, kept for the JSON audit export.
    pub extractions: Vec<ExtractionRecord>,
    /// Output column order: the model column first, then rule columns in
    /// rule order (block path) or ascending lexical order (field path).
    pub columns: Vec<String>,
}
