// Specgrid Core Library
//
// Rule-driven extraction of structured model records from vendor
// notebook spec-sheet CSVs. Main interface for the sales-assistant
// ingestion pipeline.

pub mod assembler;
pub mod config;
pub mod error;
pub mod export;
pub mod loader;
pub mod processor;
pub mod rules;
pub mod types;

// Re-export main types and functions for easy use
pub use types::*;
pub use config::{AttributionPolicy, MergeConfig, ParseConfig};
pub use error::ParseError;
pub use loader::{merge_continuation_rows, SheetLoader};
pub use processor::SheetProcessor;
pub use rules::{
    BlockCollector, BlockMatrix, BlockRuleSet, ExtractionStrategy, FieldExtractor, FieldRuleSet,
    RuleSet,
};
