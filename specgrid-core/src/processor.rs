use crate::assembler::RecordAssembler;
use crate::config::ParseConfig;
use crate::error::ParseError;
use crate::loader::SheetLoader;
use crate::rules::{ColumnOrder, RuleSet};
use crate::types::{ParseOutput, TableSource};
use std::collections::BTreeSet;
use tracing::info;

/// The single-file pipeline: load → merge → extract → assemble → clean.
///
/// Every stage runs to completion before the next begins; the processor
/// holds no cross-file state, so one processor (or one shared config +
/// rule set) can drive any number of files, one pipeline per file.
pub struct SheetProcessor {
    config: ParseConfig,
}

impl Default for SheetProcessor {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl SheetProcessor {
    pub fn new(config: ParseConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self {
            config: ParseConfig::default(),
        }
    }

    pub fn config(&self) -> &ParseConfig {
        &self.config
    }

    /// Run the full pipeline over one source with one rule set.
    ///
    /// Fails only on configuration or format errors; extraction-time
    /// ambiguity degrades to warnings, and the output always carries one
    /// row per model with empty strings where data was unavailable.
    pub fn process(
        &self,
        source: impl Into<TableSource>,
        rules: &RuleSet,
    ) -> Result<ParseOutput, ParseError> {
        let loader = SheetLoader::new(&self.config);
        let grid = loader.load_merged(source)?;

        let strategy = rules.strategy(&self.config);
        info!(
            strategy = strategy.name(),
            rows = grid.rows.len(),
            columns = grid.column_count(),
            "extracting"
        );
        let outcome = strategy.run(&grid);

        let assembler = RecordAssembler::new(&self.config);
        let mut records = outcome.records;
        assembler.clean(&mut records);

        let columns = match outcome.columns {
            ColumnOrder::Fixed(columns) => columns,
            ColumnOrder::SortedUnion => {
                let mut fields = BTreeSet::new();
                for record in &records {
                    fields.extend(record.fields.keys().cloned());
                }
                let mut columns = vec!["model_name".to_string()];
                columns.extend(fields);
                columns
            }
        };

        info!(
            records = records.len(),
            extractions = outcome.extractions.len(),
            "pipeline complete"
        );
        Ok(ParseOutput {
            records,
            extractions: outcome.extractions,
            columns,
        })
    }
}
