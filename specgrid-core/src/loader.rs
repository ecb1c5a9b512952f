use crate::config::{MergeConfig, ParseConfig};
use crate::error::ParseError;
use crate::types::{SheetGrid, TableSource};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

/// Cell spellings that upstream dataframe exports use for a missing value.
/// The loader canonicalizes these to the empty string so every later stage
/// has exactly one representation of "no data".
const NULL_MARKERS: &[&str] = &["nan", "NaN", "NAN"];

/// Loads a delimited file (or an in-memory grid) into a `SheetGrid` and
/// runs the continuation-merge pass over it.
pub struct SheetLoader<'a> {
    config: &'a ParseConfig,
}

impl<'a> SheetLoader<'a> {
    pub fn new(config: &'a ParseConfig) -> Self {
        Self { config }
    }

    /// Read the source into a grid. Cell text is preserved verbatim except
    /// for UTF-8 BOM stripping and missing-value canonicalization.
    pub fn load(&self, source: impl Into<TableSource>) -> Result<SheetGrid, ParseError> {
        let (rows, context) = match source.into() {
            TableSource::Path(path) => (self.read_csv(&path)?, path.display().to_string()),
            TableSource::Rows(rows) => {
                let rows = rows
                    .into_iter()
                    .map(|row| row.into_iter().map(|cell| normalize_cell(&cell)).collect())
                    .collect();
                (rows, "<in-memory grid>".to_string())
            }
        };

        let grid = SheetGrid::new(rows, self.config.header_rows);
        if grid.rows.is_empty() || grid.rows.iter().all(|r| r.iter().all(|c| c.is_empty())) {
            return Err(ParseError::InputEmpty { context });
        }

        debug!(
            rows = grid.rows.len(),
            columns = grid.column_count(),
            source = %context,
            "loaded grid"
        );
        Ok(grid)
    }

    /// Load and immediately apply the continuation-merge pass.
    pub fn load_merged(&self, source: impl Into<TableSource>) -> Result<SheetGrid, ParseError> {
        let mut grid = self.load(source)?;
        merge_continuation_rows(&mut grid, &self.config.merge);
        Ok(grid)
    }

    fn read_csv(&self, path: &Path) -> Result<Vec<Vec<String>>, ParseError> {
        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ParseError::InputMissing {
                    path: path.to_path_buf(),
                    source: e,
                }
            } else {
                ParseError::InputUnreadable {
                    path: path.to_path_buf(),
                    source: Box::new(e),
                }
            }
        })?;

        // flexible: vendor sheets routinely have ragged row widths
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(BufReader::new(file));

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result.map_err(|e| ParseError::InputUnreadable {
                path: path.to_path_buf(),
                source: Box::new(e),
            })?;
            rows.push(record.iter().map(normalize_cell).collect::<Vec<String>>());
        }
        Ok(rows)
    }
}

fn normalize_cell(cell: &str) -> String {
    let cell = cell.strip_prefix('\u{feff}').unwrap_or(cell);
    if NULL_MARKERS.contains(&cell.trim()) {
        return String::new();
    }
    cell.to_string()
}

/// Multi-line merge pass: per column, scanning adjacent row pairs top to
/// bottom, the NEXT row's cell is pulled UP into the current row's cell
/// (joined by a single space) and the next row's cell is cleared, when:
///
/// (a) the current cell is non-empty,
/// (b) the next cell is non-empty,
/// (c) the next cell does not start with a section-start token, and
/// (d) the current cell ends with a continuation mark.
///
/// This is a best-effort join for values that the vendor wrapped across
/// rows; it never removes character content, only relocates it.
pub fn merge_continuation_rows(grid: &mut SheetGrid, merge: &MergeConfig) {
    if grid.rows.len() < 2 {
        return;
    }

    let columns = grid.column_count();
    let mut merged = 0usize;

    for col in 0..columns {
        for row in 0..grid.rows.len() - 1 {
            let current = grid.cell(row, col);
            let next = grid.cell(row + 1, col);

            if current.is_empty() || next.is_empty() {
                continue;
            }
            if starts_new_section(next, &merge.section_start_tokens) {
                continue;
            }
            if !ends_with_continuation(current, &merge.continuation_marks) {
                continue;
            }

            let joined = format!("{current} {next}");
            // both cells exist: cell() returned non-empty for each
            grid.rows[row][col] = joined;
            grid.rows[row + 1][col] = String::new();
            merged += 1;
        }
    }

    if merged > 0 {
        debug!(merged, "continuation cells pulled up");
    }
}

fn starts_new_section(cell: &str, tokens: &[String]) -> bool {
    let cell = cell.trim_start();
    tokens.iter().any(|t| cell.starts_with(t.as_str()))
}

fn ends_with_continuation(cell: &str, marks: &[String]) -> bool {
    let cell = cell.trim_end();
    marks.iter().any(|m| cell.ends_with(m.as_str()))
}
