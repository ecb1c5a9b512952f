// Rule engine: declarative rule sets plus the two extraction strategies
// that consume them.
//
// The strategies evolved separately (cell-level pattern search vs.
// row-block positional reading) and share almost no matching code, but
// both sit behind `ExtractionStrategy` so the processor can select one
// from the rule-file shape and keep loading and cleaning shared.

pub mod block_collector;
pub mod field_extractor;
pub mod store;

pub use block_collector::{BlockCollector, BlockMatrix};
pub use field_extractor::FieldExtractor;
pub use store::{
    BlockRule, BlockRuleSet, CategoryRule, FieldRuleSet, MatchLogic, PatternRule, RuleSet,
    ScanScope,
};

use crate::config::ParseConfig;
use crate::types::{ExtractionRecord, ModelRecord, SheetGrid};

/// How the final output columns are ordered.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnOrder {
    /// Fixed order from the rule file (block path: "modeltype" first,
    /// then rule columns in rule order).
    Fixed(Vec<String>),
    /// Sorted union of the surviving field names, computed after cleaning
    /// (field path).
    SortedUnion,
}

/// What a strategy hands back to the processor: uncleaned per-model
/// records, the raw extraction facts for audit, and the column contract.
#[derive(Debug, Clone)]
pub struct StrategyOutcome {
    pub extractions: Vec<ExtractionRecord>,
    pub records: Vec<ModelRecord>,
    pub columns: ColumnOrder,
}

/// One extraction strategy over a loaded grid. Strategies never fail:
/// extraction-time ambiguity degrades to warnings and empty values.
pub trait ExtractionStrategy {
    fn name(&self) -> &'static str;
    fn run(&self, grid: &SheetGrid) -> StrategyOutcome;
}

impl RuleSet {
    /// Select the strategy matching this rule set's shape.
    pub fn strategy<'a>(&'a self, config: &'a ParseConfig) -> Box<dyn ExtractionStrategy + 'a> {
        match self {
            RuleSet::Field(rules) => Box::new(FieldExtractor::new(rules, config)),
            RuleSet::Block(rules) => Box::new(BlockCollector::new(rules, config)),
        }
    }
}
