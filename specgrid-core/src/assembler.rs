use crate::config::{AttributionPolicy, ParseConfig};
use crate::types::{ExtractionRecord, ModelRecord, SheetGrid};
use regex::Regex;
use tracing::{debug, warn};

/// A model discovered in the grid: its identifier and the column it was
/// seen in (or the header column, for pseudo-models).
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSlot {
    pub name: String,
    pub column: usize,
}

/// Groups extraction records by model, merges duplicate field values, and
/// cleans values against the junk-token list.
pub struct RecordAssembler<'a> {
    config: &'a ParseConfig,
}

impl<'a> RecordAssembler<'a> {
    pub fn new(config: &'a ParseConfig) -> Self {
        Self { config }
    }

    /// Field-extractor path: discover models, attribute every record to
    /// its model(s), merge duplicates. Model names are unique within one
    /// run by construction (discovery deduplicates).
    pub fn assemble(
        &self,
        grid: &SheetGrid,
        extractions: &[ExtractionRecord],
    ) -> Vec<ModelRecord> {
        let slots = self.discover_models(grid);
        if slots.is_empty() {
            warn!("no model identifiers or header columns found; emitting no records");
            return Vec::new();
        }

        let mut records: Vec<ModelRecord> = slots
            .iter()
            .map(|slot| ModelRecord::new(slot.name.clone()))
            .collect();

        for extraction in extractions {
            let field = field_column_name(&extraction.category, &extraction.field_type);
            for (index, slot) in slots.iter().enumerate() {
                let exclusive = self.belongs_exclusively(extraction, slot, index);
                let assign = match (exclusive, self.config.attribution) {
                    (true, _) => true,
                    // Attribution undetermined: AssignToAll surfaces the
                    // fact on every model so downstream ingestion never
                    // loses it to a heuristic miss.
                    (false, AttributionPolicy::AssignToAll) => !self.exclusive_elsewhere(
                        extraction,
                        &slots,
                    ),
                    (false, AttributionPolicy::Strict) => false,
                };
                if assign {
                    records[index].merge_field(&field, extraction.value.trim());
                }
            }
        }

        records
    }

    /// Source-location heuristic: a record is exclusively one model's when
    /// it came from the column the model identifier was discovered in, or
    /// from the model's positional column (`fixed_offset + index`).
    fn belongs_exclusively(
        &self,
        extraction: &ExtractionRecord,
        slot: &ModelSlot,
        index: usize,
    ) -> bool {
        extraction.column == slot.column
            || extraction.column == self.config.fixed_offset + index
    }

    /// True when the record resolves exclusively to some OTHER model —
    /// then AssignToAll must not also copy it onto this one.
    fn exclusive_elsewhere(&self, extraction: &ExtractionRecord, slots: &[ModelSlot]) -> bool {
        slots
            .iter()
            .enumerate()
            .any(|(index, slot)| self.belongs_exclusively(extraction, slot, index))
    }

    /// Scan every cell for tokens of the configured model-identifier shape
    /// (first occurrence wins the column). When none exist anywhere, fall
    /// back to up to `max_fallback_models` non-metadata column headers as
    /// pseudo-model identifiers.
    pub fn discover_models(&self, grid: &SheetGrid) -> Vec<ModelSlot> {
        let re = match Regex::new(&self.config.model_pattern) {
            Ok(re) => re,
            Err(e) => {
                warn!(pattern = %self.config.model_pattern, error = %e,
                    "model pattern does not compile; using header fallback");
                return self.fallback_models(grid);
            }
        };

        let mut slots: Vec<ModelSlot> = Vec::new();
        for (row, cells) in grid.rows.iter().enumerate() {
            for (col, cell) in cells.iter().enumerate() {
                for m in re.find_iter(cell) {
                    let name = m.as_str().to_string();
                    if !slots.iter().any(|slot| slot.name == name) {
                        debug!(model = %name, row, column = col, "discovered model identifier");
                        slots.push(ModelSlot { name, column: col });
                    }
                }
            }
        }

        if slots.is_empty() {
            return self.fallback_models(grid);
        }
        slots
    }

    fn fallback_models(&self, grid: &SheetGrid) -> Vec<ModelSlot> {
        if grid.header_rows == 0 {
            return Vec::new();
        }
        let slots: Vec<ModelSlot> = (self.config.fixed_offset..grid.column_count())
            .filter_map(|col| {
                let header = grid.column_header(col).trim();
                if header.is_empty() {
                    None
                } else {
                    Some(ModelSlot {
                        name: header.to_string(),
                        column: col,
                    })
                }
            })
            .take(self.config.max_fallback_models)
            .collect();
        if !slots.is_empty() {
            debug!(count = slots.len(), "using column headers as pseudo-models");
        }
        slots
    }

    /// Shared cleaning step, both paths: junk values are nulled (the field
    /// is dropped), surviving values get whitespace runs collapsed to a
    /// single space and are trimmed. Applying this twice is a no-op.
    pub fn clean(&self, records: &mut Vec<ModelRecord>) {
        for record in records.iter_mut() {
            let cleaned: Vec<(String, String)> = record
                .fields
                .iter()
                .map(|(field, value)| {
                    (
                        field.clone(),
                        clean_value(value, &self.config.junk_tokens),
                    )
                })
                .collect();
            for (field, value) in cleaned {
                // junk values become the empty string, keeping the record
                // set rectangular for downstream ingestion
                record.fields.insert(field, value);
            }
        }
    }
}

/// Collapse internal whitespace runs to a single space, trim, and null
/// out values that equal a junk token. Idempotent.
pub fn clean_value(value: &str, junk_tokens: &[String]) -> String {
    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    if junk_tokens.iter().any(|junk| junk == &collapsed) {
        String::new()
    } else {
        collapsed
    }
}

/// Output column for a (category, field_type) pair: "hardware_info" +
/// "cpu" → "hardware_cpu"; a category whose stem equals its field type
/// ("model_info" + "model") collapses to the stem alone.
fn field_column_name(category: &str, field_type: &str) -> String {
    let stem = category.strip_suffix("_info").unwrap_or(category);
    if stem == field_type {
        stem.to_string()
    } else {
        format!("{stem}_{field_type}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_name_collapses_redundant_stem() {
        assert_eq!(field_column_name("model_info", "model"), "model");
        assert_eq!(field_column_name("hardware_info", "cpu"), "hardware_cpu");
        assert_eq!(field_column_name("battery_info", "battery"), "battery");
    }

    #[test]
    fn clean_value_is_a_no_op_on_clean_input() {
        let junk = vec!["-".to_string()];
        assert_eq!(clean_value("16GB DDR5", &junk), "16GB DDR5");
        assert_eq!(clean_value("", &junk), "");
    }

    #[test]
    fn clean_value_compares_junk_after_collapsing() {
        let junk = vec!["N/A".to_string()];
        assert_eq!(clean_value("  N/A  ", &junk), "");
    }
}
