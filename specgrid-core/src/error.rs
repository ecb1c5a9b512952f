use std::path::PathBuf;
use thiserror::Error;

/// Source type for I/O-ish failures where the underlying error may come
/// from std, the csv crate, or serde.
pub type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Fatal errors for a single file's pipeline run.
///
/// Only configuration and format problems abort a run. Extraction-time
/// ambiguities (no row matched a rule, a row too short for a model column,
/// duplicate block matches) are logged as warnings and the run continues,
/// producing empty-string placeholders — downstream ingestion expects a
/// complete, rectangular record set.
#[derive(Debug, Error)]
pub enum ParseError {
    // Rule file problems (configuration errors)
    #[error("rule file not found: {path}")]
    RuleFileMissing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read rule file {path}")]
    RuleFileUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("rule file {path} is not valid JSON")]
    RuleFileMalformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid rule '{rule}': {reason}")]
    RuleInvalid { rule: String, reason: String },

    // Input file problems (format errors)
    #[error("input file not found: {path}")]
    InputMissing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read input file {path}")]
    InputUnreadable {
        path: PathBuf,
        #[source]
        source: BoxedSource,
    },

    #[error("input produced an empty grid: {context}")]
    InputEmpty { context: String },

    // Output problems
    #[error("failed to write output {path}")]
    OutputFailed {
        path: PathBuf,
        #[source]
        source: BoxedSource,
    },
}

impl ParseError {
    /// True for rule-file problems. Callers use this to distinguish a bad
    /// rule deployment from a bad input file.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ParseError::RuleFileMissing { .. }
                | ParseError::RuleFileUnreadable { .. }
                | ParseError::RuleFileMalformed { .. }
                | ParseError::RuleInvalid { .. }
        )
    }

    /// True for input-file problems (missing, unreadable, or empty).
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            ParseError::InputMissing { .. }
                | ParseError::InputUnreadable { .. }
                | ParseError::InputEmpty { .. }
        )
    }
}
