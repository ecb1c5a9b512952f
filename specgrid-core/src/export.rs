use crate::error::ParseError;
use crate::types::{ExtractionRecord, ParseOutput};
use std::path::Path;

/// Write the structured record set as CSV, header row first, one row per
/// model, columns in the output's column order. The first column is the
/// model column; the remaining columns are looked up by name, empty when
/// a record lacks the field.
pub fn write_records_csv(path: &Path, output: &ParseOutput) -> Result<(), ParseError> {
    let failed = |source: csv::Error| ParseError::OutputFailed {
        path: path.to_path_buf(),
        source: Box::new(source),
    };

    let mut writer = csv::Writer::from_path(path).map_err(failed)?;
    writer.write_record(&output.columns).map_err(failed)?;

    for record in &output.records {
        let row: Vec<&str> = output
            .columns
            .iter()
            .enumerate()
            .map(|(index, column)| {
                if index == 0 {
                    record.model_name.as_str()
                } else {
                    record
                        .fields
                        .get(column)
                        .map(|value| value.as_str())
                        .unwrap_or("")
                }
            })
            .collect();
        writer.write_record(&row).map_err(failed)?;
    }

    writer.flush().map_err(|e| ParseError::OutputFailed {
        path: path.to_path_buf(),
        source: Box::new(e),
    })
}

/// Dump the raw extraction records as pretty JSON for audit, with a
/// capture timestamp and count up front.
pub fn write_extraction_audit(
    path: &Path,
    extractions: &[ExtractionRecord],
) -> Result<(), ParseError> {
    let payload = serde_json::json!({
        "captured_at": chrono::Utc::now().to_rfc3339(),
        "extraction_count": extractions.len(),
        "extractions": extractions,
    });
    let json = serde_json::to_string_pretty(&payload).map_err(|e| ParseError::OutputFailed {
        path: path.to_path_buf(),
        source: Box::new(e),
    })?;
    std::fs::write(path, json).map_err(|e| ParseError::OutputFailed {
        path: path.to_path_buf(),
        source: Box::new(e),
    })
}
