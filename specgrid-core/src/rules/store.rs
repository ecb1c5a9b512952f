use crate::error::ParseError;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Categories whose rules scan only columns with a matching header.
/// This is an optimization for dense sheets, not a semantic difference:
/// these specs always live under their own column headings.
const COLUMN_SCOPED_CATEGORIES: &[&str] = &[
    "battery_extraction",
    "dimension_extraction",
    "timeline_extraction",
    "software_extraction",
    "certification_extraction",
];

// ===== LOADED RULE TYPES =====

/// One keyword + regex unit: keywords trigger, regexes extract.
#[derive(Debug, Clone)]
pub struct PatternRule {
    /// Case-insensitive substring triggers.
    pub patterns: Vec<String>,
    /// Extraction regexes, applied in order after a trigger hit. Kept as
    /// source strings; compiled per run so one corrupt pattern degrades to
    /// a warning instead of aborting the file.
    pub regex: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanScope {
    /// Scan every cell of the grid.
    AllCells,
    /// Scan only columns whose header contains one of the rule's keywords.
    KeywordColumns,
}

/// All rules for one category (e.g. `hardware_extraction`), keyed by
/// sub-category. Single-shape categories store one sub-rule under the
/// category stem ("model_extraction" → "model").
#[derive(Debug, Clone)]
pub struct CategoryRule {
    /// Output tag for records of this category (e.g. "hardware_info").
    pub label: String,
    pub scope: ScanScope,
    pub subrules: BTreeMap<String, PatternRule>,
}

/// Rule set for the cell-level pattern-search strategy.
#[derive(Debug, Clone)]
pub struct FieldRuleSet {
    /// BTreeMap: category traversal order must be reproducible.
    pub categories: BTreeMap<String, CategoryRule>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchLogic {
    And,
    Or,
}

/// One row-span rule for the block strategy.
#[derive(Debug, Clone)]
pub struct BlockRule {
    pub keywords: Vec<String>,
    pub logic: MatchLogic,
    /// Consecutive rows composing one matched block. Always >= 1.
    pub rowspan: usize,
    pub column_name: String,
}

/// Rule set for the row-span block strategy.
#[derive(Debug, Clone)]
pub struct BlockRuleSet {
    pub model_count: usize,
    pub model_type: String,
    pub rules: Vec<BlockRule>,
}

/// A loaded, validated, immutable rule set. Loaded once at pipeline start
/// and passed by reference into each run, so concurrent per-file pipelines
/// can share one instance.
#[derive(Debug, Clone)]
pub enum RuleSet {
    Field(FieldRuleSet),
    Block(BlockRuleSet),
}

// ===== RAW FILE SHAPES =====

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPatternRule {
    #[serde(default)]
    patterns: Vec<String>,
    #[serde(default)]
    regex: Vec<String>,
}

// deny_unknown_fields on RawPatternRule makes the untagged dispatch
// unambiguous: a nested mapping has sub-category keys, which a flat rule
// object rejects.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawCategory {
    Flat(RawPatternRule),
    Nested(BTreeMap<String, RawPatternRule>),
}

#[derive(Debug, Deserialize)]
struct RawBlockMeta {
    model_count: usize,
    #[serde(default)]
    model_type: String,
}

fn default_rowspan() -> usize {
    1
}

#[derive(Debug, Deserialize)]
struct RawBlockRule {
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    logic: Option<String>,
    #[serde(default = "default_rowspan")]
    rowspan: usize,
    #[serde(default)]
    column_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawBlockFile(Vec<RawBlockMeta>, Vec<RawBlockRule>);

// ===== LOADING =====

impl RuleSet {
    /// Load and validate a rule file. The JSON top-level shape selects the
    /// strategy: an object is a field-extraction rule set, an array the
    /// `[metadata, rule_list]` pair of a block rule set.
    ///
    /// The three failure modes stay distinguishable for the caller:
    /// file absent, file not valid JSON, rule semantically invalid.
    pub fn load(path: impl AsRef<Path>) -> Result<RuleSet, ParseError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ParseError::RuleFileMissing {
                    path: path.to_path_buf(),
                    source: e,
                }
            } else {
                ParseError::RuleFileUnreadable {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;

        let value: serde_json::Value =
            serde_json::from_str(&content).map_err(|e| ParseError::RuleFileMalformed {
                path: path.to_path_buf(),
                source: e,
            })?;

        match value {
            serde_json::Value::Object(_) => {
                let raw: BTreeMap<String, RawCategory> = serde_json::from_value(value)
                    .map_err(|e| ParseError::RuleFileMalformed {
                        path: path.to_path_buf(),
                        source: e,
                    })?;
                Ok(RuleSet::Field(FieldRuleSet::from_raw(raw)?))
            }
            serde_json::Value::Array(_) => {
                let raw: RawBlockFile = serde_json::from_value(value).map_err(|e| {
                    ParseError::RuleFileMalformed {
                        path: path.to_path_buf(),
                        source: e,
                    }
                })?;
                Ok(RuleSet::Block(BlockRuleSet::from_raw(raw)?))
            }
            _ => Err(ParseError::RuleInvalid {
                rule: path.display().to_string(),
                reason: "top level must be a category mapping or a [metadata, rules] pair"
                    .to_string(),
            }),
        }
    }
}

impl FieldRuleSet {
    fn from_raw(raw: BTreeMap<String, RawCategory>) -> Result<Self, ParseError> {
        let mut categories = BTreeMap::new();

        for (name, raw_category) in raw {
            let stem = name.strip_suffix("_extraction").unwrap_or(&name);
            let scope = if COLUMN_SCOPED_CATEGORIES.contains(&name.as_str()) {
                ScanScope::KeywordColumns
            } else {
                ScanScope::AllCells
            };

            let mut subrules = BTreeMap::new();
            match raw_category {
                RawCategory::Flat(rule) => {
                    subrules.insert(stem.to_string(), validate_rule(&name, rule)?);
                }
                RawCategory::Nested(nested) => {
                    for (sub, rule) in nested {
                        let id = format!("{name}.{sub}");
                        subrules.insert(sub, validate_rule(&id, rule)?);
                    }
                }
            }

            categories.insert(
                name.clone(),
                CategoryRule {
                    label: format!("{stem}_info"),
                    scope,
                    subrules,
                },
            );
        }

        Ok(Self { categories })
    }
}

fn validate_rule(id: &str, raw: RawPatternRule) -> Result<PatternRule, ParseError> {
    if raw.patterns.is_empty() && raw.regex.is_empty() {
        return Err(ParseError::RuleInvalid {
            rule: id.to_string(),
            reason: "rule defines neither keywords nor extraction patterns".to_string(),
        });
    }
    for pattern in &raw.regex {
        Regex::new(pattern).map_err(|e| ParseError::RuleInvalid {
            rule: id.to_string(),
            reason: format!("regex '{pattern}' does not compile: {e}"),
        })?;
    }
    Ok(PatternRule {
        patterns: raw.patterns,
        regex: raw.regex,
    })
}

impl BlockRuleSet {
    fn from_raw(raw: RawBlockFile) -> Result<Self, ParseError> {
        let RawBlockFile(meta, rules) = raw;
        let meta = meta.first().ok_or_else(|| ParseError::RuleInvalid {
            rule: "metadata".to_string(),
            reason: "metadata list is empty".to_string(),
        })?;
        if meta.model_count == 0 {
            return Err(ParseError::RuleInvalid {
                rule: "metadata".to_string(),
                reason: "model_count must be at least 1".to_string(),
            });
        }

        let mut out = Vec::with_capacity(rules.len());
        for (index, rule) in rules.into_iter().enumerate() {
            let id = rule
                .column_name
                .clone()
                .unwrap_or_else(|| format!("rule #{index}"));
            if rule.keywords.is_empty() {
                return Err(ParseError::RuleInvalid {
                    rule: id,
                    reason: "rule has no keywords".to_string(),
                });
            }
            if rule.rowspan == 0 {
                return Err(ParseError::RuleInvalid {
                    rule: id,
                    reason: "rowspan must be at least 1".to_string(),
                });
            }
            let logic = match rule.logic.as_deref() {
                None => MatchLogic::Or,
                Some(raw_logic) => match raw_logic.to_uppercase().as_str() {
                    "AND" => MatchLogic::And,
                    "OR" => MatchLogic::Or,
                    other => {
                        return Err(ParseError::RuleInvalid {
                            rule: id,
                            reason: format!("unknown logic '{other}' (expected AND or OR)"),
                        })
                    }
                },
            };
            let column_name = rule
                .column_name
                .unwrap_or_else(|| derive_column_name(&rule.keywords[0]));
            out.push(BlockRule {
                keywords: rule.keywords,
                logic,
                rowspan: rule.rowspan,
                column_name,
            });
        }

        Ok(Self {
            model_count: meta.model_count,
            model_type: meta.model_type.clone(),
            rules: out,
        })
    }
}

/// Fallback output column name for a rule without an explicit one:
/// lowercased first keyword with non-alphanumerics collapsed to '_'.
fn derive_column_name(keyword: &str) -> String {
    let mut name = String::with_capacity(keyword.len());
    let mut last_underscore = false;
    for ch in keyword.to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            name.push(ch);
            last_underscore = false;
        } else if !last_underscore {
            name.push('_');
            last_underscore = true;
        }
    }
    name.trim_matches('_').to_string()
}
