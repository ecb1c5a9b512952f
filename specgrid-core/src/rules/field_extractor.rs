use super::store::{CategoryRule, FieldRuleSet, PatternRule, ScanScope};
use super::{ColumnOrder, ExtractionStrategy, StrategyOutcome};
use crate::assembler::RecordAssembler;
use crate::config::ParseConfig;
use crate::types::{ExtractionRecord, SheetGrid};
use regex::Regex;
use tracing::warn;

/// Cell-level pattern-search strategy: for every rule category, every cell
/// in scope is tested against the category's keyword triggers; on a hit,
/// each extraction regex is applied find-all style.
///
/// Traversal is category → sub-category → row → column over BTreeMaps, so
/// record order is reproducible for identical input.
pub struct FieldExtractor<'a> {
    rules: &'a FieldRuleSet,
    config: &'a ParseConfig,
}

impl<'a> FieldExtractor<'a> {
    pub fn new(rules: &'a FieldRuleSet, config: &'a ParseConfig) -> Self {
        Self { rules, config }
    }

    /// Scan the grid and emit one record per (rule, cell, regex match),
    /// deduplicated within each cell.
    pub fn extract(&self, grid: &SheetGrid) -> Vec<ExtractionRecord> {
        let mut records = Vec::new();

        for (category_name, category) in &self.rules.categories {
            let columns = self.columns_in_scope(grid, category);

            for (field_type, rule) in &category.subrules {
                for row in 0..grid.rows.len() {
                    for &col in &columns {
                        let cell = grid.cell(row, col);
                        if cell.is_empty() {
                            continue;
                        }
                        if !keyword_hit(cell, &rule.patterns) {
                            continue;
                        }
                        self.extract_from_cell(
                            grid,
                            category_name,
                            &category.label,
                            field_type,
                            rule,
                            cell,
                            row,
                            col,
                            &mut records,
                        );
                    }
                }
            }
        }

        records
    }

    #[allow(clippy::too_many_arguments)]
    fn extract_from_cell(
        &self,
        grid: &SheetGrid,
        category_name: &str,
        label: &str,
        field_type: &str,
        rule: &PatternRule,
        cell: &str,
        row: usize,
        col: usize,
        records: &mut Vec<ExtractionRecord>,
    ) {
        let source = format!("{}:{}", source_column(grid, col), row);
        let mut seen: Vec<String> = Vec::new();
        let mut emit = |value: String| {
            if value.is_empty() || seen.contains(&value) {
                return;
            }
            seen.push(value.clone());
            records.push(ExtractionRecord {
                category: label.to_string(),
                field_type: field_type.to_string(),
                value,
                source: source.clone(),
                row,
                column: col,
                raw_data: cell.to_string(),
            });
        };

        if rule.regex.is_empty() {
            // keyword-only rule: the whole cell is the value
            emit(cell.trim().to_string());
            return;
        }

        for pattern in &rule.regex {
            // Compiled here rather than at load so a rule set corrupted
            // after validation degrades to a warning, not an aborted run.
            let re = match Regex::new(pattern) {
                Ok(re) => re,
                Err(e) => {
                    warn!(
                        category = category_name,
                        field_type,
                        pattern,
                        error = %e,
                        "skipping regex that no longer compiles"
                    );
                    continue;
                }
            };
            for caps in re.captures_iter(cell) {
                let matched = caps
                    .get(1)
                    .unwrap_or_else(|| caps.get(0).expect("group 0 always present"));
                emit(matched.as_str().to_string());
            }
        }
    }

    /// Column scope for a category: all columns, or (for column-scoped
    /// categories) only those whose header contains one of the category's
    /// keywords. A grid without headers falls back to all columns.
    fn columns_in_scope(&self, grid: &SheetGrid, category: &CategoryRule) -> Vec<usize> {
        let all: Vec<usize> = (0..grid.column_count()).collect();
        if category.scope == ScanScope::AllCells || grid.header_rows == 0 {
            return all;
        }

        let scoped: Vec<usize> = all
            .iter()
            .copied()
            .filter(|&col| {
                let header = grid.column_header(col);
                !header.is_empty()
                    && category
                        .subrules
                        .values()
                        .any(|rule| keyword_hit(header, &rule.patterns))
            })
            .collect();

        if scoped.is_empty() {
            // no header matched: scan everything rather than silently skip
            all
        } else {
            scoped
        }
    }
}

impl<'a> ExtractionStrategy for FieldExtractor<'a> {
    fn name(&self) -> &'static str {
        "FieldExtractor"
    }

    fn run(&self, grid: &SheetGrid) -> StrategyOutcome {
        let extractions = self.extract(grid);
        let assembler = RecordAssembler::new(self.config);
        let records = assembler.assemble(grid, &extractions);
        StrategyOutcome {
            extractions,
            records,
            columns: ColumnOrder::SortedUnion,
        }
    }
}

fn keyword_hit(text: &str, keywords: &[String]) -> bool {
    if keywords.is_empty() {
        return true; // regex-only rule: every cell is a candidate
    }
    let haystack = text.to_lowercase();
    keywords.iter().any(|k| haystack.contains(&k.to_lowercase()))
}

fn source_column(grid: &SheetGrid, col: usize) -> String {
    let header = grid.column_header(col);
    if header.is_empty() {
        col.to_string()
    } else {
        header.to_string()
    }
}
