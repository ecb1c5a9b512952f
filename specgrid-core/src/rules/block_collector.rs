use super::store::{BlockRule, BlockRuleSet, MatchLogic};
use super::{ColumnOrder, ExtractionStrategy, StrategyOutcome};
use crate::config::ParseConfig;
use crate::types::{ExtractionRecord, ModelRecord, SheetGrid};
use tracing::warn;

/// Per-model field values produced by the block strategy: one row per
/// model, one column per rule, always rectangular (empty string where no
/// data was found).
#[derive(Debug, Clone, PartialEq)]
pub struct BlockMatrix {
    pub column_names: Vec<String>,
    /// values[model][rule]
    pub values: Vec<Vec<String>>,
    /// Row index of each rule's chosen block, None when nothing matched.
    pub matched_rows: Vec<Option<usize>>,
}

/// Row-span block strategy: each rule selects whole row(s) by keyword
/// logic, then one value per model column is read out of the block at a
/// fixed column offset.
pub struct BlockCollector<'a> {
    rules: &'a BlockRuleSet,
    config: &'a ParseConfig,
}

impl<'a> BlockCollector<'a> {
    pub fn new(rules: &'a BlockRuleSet, config: &'a ParseConfig) -> Self {
        Self { rules, config }
    }

    /// Collect the model × rule value matrix. Never fails: rules without a
    /// match, ambiguous matches, and rows too short for a model column all
    /// degrade to empty strings with a warning.
    pub fn collect(&self, grid: &SheetGrid) -> BlockMatrix {
        let model_count = self.rules.model_count;
        let mut values = vec![Vec::with_capacity(self.rules.rules.len()); model_count];
        let mut matched_rows = Vec::with_capacity(self.rules.rules.len());

        for rule in &self.rules.rules {
            // Header rows name the model columns; they are not data and
            // never participate in block matching.
            let matches: Vec<usize> = grid
                .data_row_range()
                .filter(|&row| row_matches(grid, row, rule))
                .collect();

            match matches.split_first() {
                None => {
                    // one warning per rule, not per model
                    warn!(
                        column = %rule.column_name,
                        keywords = ?rule.keywords,
                        "no row matched rule; emitting empty values"
                    );
                    for model_values in values.iter_mut() {
                        model_values.push(String::new());
                    }
                    matched_rows.push(None);
                }
                Some((&first, rest)) => {
                    if !rest.is_empty() {
                        warn!(
                            column = %rule.column_name,
                            kept_row = first,
                            discarded = rest.len(),
                            "multiple blocks matched; keeping the lowest row"
                        );
                    }
                    for (model, model_values) in values.iter_mut().enumerate() {
                        model_values.push(self.read_block_value(grid, first, rule, model));
                    }
                    matched_rows.push(Some(first));
                }
            }
        }

        BlockMatrix {
            column_names: self
                .rules
                .rules
                .iter()
                .map(|rule| rule.column_name.clone())
                .collect(),
            values,
            matched_rows,
        }
    }

    /// Read one model's value from the block starting at `start`. A block
    /// row past the end of the grid, or too short to have the model's
    /// column, empties the whole value for this model (with a warning) —
    /// the output stays rectangular, never partial-and-misaligned.
    fn read_block_value(
        &self,
        grid: &SheetGrid,
        start: usize,
        rule: &BlockRule,
        model: usize,
    ) -> String {
        let col = self.config.fixed_offset + model;
        let mut lines = Vec::with_capacity(rule.rowspan);

        for row in start..start + rule.rowspan {
            if row >= grid.rows.len() || grid.rows[row].len() <= col {
                warn!(
                    column = %rule.column_name,
                    row,
                    model_column = col,
                    "block row missing model column; emitting empty value"
                );
                return String::new();
            }

            let value = grid.rows[row][col].clone();
            let line = match self.config.label_column {
                Some(label_col) if rule.rowspan > 1 => {
                    let label = grid.cell(row, label_col);
                    if label.is_empty() || value.is_empty() {
                        value
                    } else {
                        format!("{label}: {value}")
                    }
                }
                _ => value,
            };
            lines.push(line);
        }

        lines.join("\n").trim().to_string()
    }
}

impl<'a> ExtractionStrategy for BlockCollector<'a> {
    fn name(&self) -> &'static str {
        "BlockCollector"
    }

    fn run(&self, grid: &SheetGrid) -> StrategyOutcome {
        let matrix = self.collect(grid);

        let mut extractions = Vec::new();
        let mut records = Vec::with_capacity(self.rules.model_count);
        for (model, model_values) in matrix.values.iter().enumerate() {
            let mut record = ModelRecord::new(self.rules.model_type.clone());
            for (rule_index, value) in model_values.iter().enumerate() {
                let column_name = &matrix.column_names[rule_index];
                record.fields.insert(column_name.clone(), value.clone());
                if let Some(row) = matrix.matched_rows[rule_index] {
                    let column = self.config.fixed_offset + model;
                    let rowspan = self.rules.rules[rule_index].rowspan;
                    // raw_data stays the untouched cell text, not the
                    // label-prefixed value
                    let raw_data = (row..row + rowspan)
                        .map(|r| grid.cell(r, column))
                        .collect::<Vec<_>>()
                        .join("\n");
                    extractions.push(ExtractionRecord {
                        category: "block_info".to_string(),
                        field_type: column_name.clone(),
                        value: value.clone(),
                        source: format!("{column}:{row}"),
                        row,
                        column,
                        raw_data,
                    });
                }
            }
            records.push(record);
        }

        let mut columns = vec!["modeltype".to_string()];
        columns.extend(matrix.column_names.iter().cloned());
        StrategyOutcome {
            extractions,
            records,
            columns: ColumnOrder::Fixed(columns),
        }
    }
}

fn row_matches(grid: &SheetGrid, row: usize, rule: &BlockRule) -> bool {
    match rule.logic {
        MatchLogic::Or => rule
            .keywords
            .iter()
            .any(|keyword| grid.row_contains(row, keyword)),
        MatchLogic::And => rule
            .keywords
            .iter()
            .all(|keyword| grid.row_contains(row, keyword)),
    }
}
