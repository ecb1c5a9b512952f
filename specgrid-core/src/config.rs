use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// Default value functions for serde
fn default_header_rows() -> usize {
    1
}

fn default_fixed_offset() -> usize {
    2 // first two columns are metadata (update marker + row label)
}

fn default_max_fallback_models() -> usize {
    4
}

fn default_model_pattern() -> String {
    // Short vendor model codes: "APX938", "QZ440", "NBX120A"
    r"\b[A-Z]{2,3}\d{3}[A-Z]?\b".to_string()
}

fn default_section_start_tokens() -> Vec<String> {
    vec![
        "Updated".to_string(),
        "Stage".to_string(),
        "Model".to_string(),
        "P/N".to_string(),
        "ID".to_string(),
        "MB".to_string(),
        "DB".to_string(),
    ]
}

fn default_continuation_marks() -> Vec<String> {
    vec![
        ",".to_string(),
        ":".to_string(),
        "(".to_string(),
        "-".to_string(),
        "：".to_string(), // full-width colon, common in vendor sheets
    ]
}

fn default_junk_tokens() -> Vec<String> {
    vec![
        "-".to_string(),
        "--".to_string(),
        "/".to_string(),
        "N/A".to_string(),
        "n/a".to_string(),
        "NA".to_string(),
        "TBD".to_string(),
        "None".to_string(),
    ]
}

/// How the assembler resolves an extraction record whose source location
/// cannot be tied to exactly one model.
///
/// `AssignToAll` is deliberately over-inclusive: an ambiguous fact lands
/// on every discovered model, so downstream ingestion never loses it to
/// a heuristic miss. `Strict` drops ambiguous facts instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributionPolicy {
    AssignToAll,
    Strict,
}

impl Default for AttributionPolicy {
    fn default() -> Self {
        AttributionPolicy::AssignToAll
    }
}

impl FromStr for AttributionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "assign_to_all" | "all" => Ok(AttributionPolicy::AssignToAll),
            "strict" => Ok(AttributionPolicy::Strict),
            other => Err(format!(
                "unknown attribution policy '{other}' (expected 'assign_to_all' or 'strict')"
            )),
        }
    }
}

/// Knobs for the multi-line continuation merge pass.
///
/// The merge is a best-effort heuristic: a cell ending in a continuation
/// mark pulls the cell below it up, unless the cell below opens a new
/// section. Both token lists are configuration, not code, so they can be
/// tuned per vendor without a release.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    /// A cell starting with any of these never gets merged upward.
    #[serde(default = "default_section_start_tokens")]
    pub section_start_tokens: Vec<String>,
    /// A cell must end with one of these to pull the next row's cell up.
    #[serde(default = "default_continuation_marks")]
    pub continuation_marks: Vec<String>,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            section_start_tokens: default_section_start_tokens(),
            continuation_marks: default_continuation_marks(),
        }
    }
}

/// Configuration for one pipeline run. Immutable once constructed; safe
/// to share across per-file pipeline invocations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseConfig {
    /// Leading rows treated as column headers, not data.
    #[serde(default = "default_header_rows")]
    pub header_rows: usize,
    /// Metadata columns before the first model column (block path).
    #[serde(default = "default_fixed_offset")]
    pub fixed_offset: usize,
    /// Optional column whose text prefixes each line of a multi-row block
    /// value as "label: value".
    #[serde(default)]
    pub label_column: Option<usize>,
    /// Continuation-merge heuristics.
    #[serde(default)]
    pub merge: MergeConfig,
    /// Values nulled out by the cleaning pass (compared after whitespace
    /// collapsing).
    #[serde(default = "default_junk_tokens")]
    pub junk_tokens: Vec<String>,
    /// Regex for model identifier tokens in raw cells (field path).
    #[serde(default = "default_model_pattern")]
    pub model_pattern: String,
    /// Maximum column headers used as pseudo-models when no identifier
    /// token is found anywhere in the grid.
    #[serde(default = "default_max_fallback_models")]
    pub max_fallback_models: usize,
    /// Policy for ambiguous model attribution (field path).
    #[serde(default)]
    pub attribution: AttributionPolicy,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            header_rows: default_header_rows(),
            fixed_offset: default_fixed_offset(),
            label_column: None,
            merge: MergeConfig::default(),
            junk_tokens: default_junk_tokens(),
            model_pattern: default_model_pattern(),
            max_fallback_models: default_max_fallback_models(),
            attribution: AttributionPolicy::default(),
        }
    }
}

impl ParseConfig {
    /// Load config from file path (YAML).
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ParseConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load config with fallback to defaults.
    pub fn load_with_fallback(path: Option<&str>) -> Self {
        match path {
            Some(p) => Self::load_from_file(p).unwrap_or_else(|_| {
                eprintln!("⚠️  Failed to load config from {}, using defaults", p);
                Self::default()
            }),
            None => Self::default(),
        }
    }
}
