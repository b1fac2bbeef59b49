//! CSV export

use csv::{QuoteStyle, WriterBuilder};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::state::AppState;
use crate::csv::schema::INTERVENTION_COLUMNS;
use crate::entities::Intervention;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to serialize record: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to finish CSV output: {0}")]
    Output(String),
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String, ExportError> {
    let bytes = wtr
        .into_inner()
        .map_err(|e| ExportError::Output(e.error().to_string()))?;
    String::from_utf8(bytes).map_err(|e| ExportError::Output(e.to_string()))
}

fn cell(value: Option<&Value>) -> Result<String, ExportError> {
    Ok(match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(v @ (Value::Array(_) | Value::Object(_))) => serde_json::to_string(v)?,
        Some(v) => v.to_string(),
    })
}

/// One row per record, header = union of all field names
///
/// Nested values are written as JSON text. Every non-numeric cell is quoted.
pub fn export_records<T: Serialize>(records: &[T]) -> Result<String, ExportError> {
    let mut rows = Vec::with_capacity(records.len());
    let mut header: Vec<String> = Vec::new();
    for record in records {
        let value = serde_json::to_value(record)?;
        if let Value::Object(map) = &value {
            for key in map.keys() {
                if !header.iter().any(|h| h == key) {
                    header.push(key.clone());
                }
            }
        }
        rows.push(value);
    }

    let mut wtr = WriterBuilder::new()
        .quote_style(QuoteStyle::NonNumeric)
        .from_writer(Vec::new());
    if header.is_empty() {
        return finish(wtr);
    }
    wtr.write_record(&header)?;
    for row in &rows {
        let cells = header
            .iter()
            .map(|key| cell(row.get(key)))
            .collect::<Result<Vec<_>, _>>()?;
        wtr.write_record(&cells)?;
    }
    finish(wtr)
}

/// Interventions in the import layout, targets written as asset codes
///
/// Re-importing the output resolves the same targets as long as their
/// codes are unchanged. Pertinenza targets are written with their plesso's
/// code. Types are written as their exact labels, which the importer
/// recognises before falling back to substring matching.
pub fn export_interventions_importable(
    state: &AppState,
    interventions: &[&Intervention],
) -> Result<String, ExportError> {
    let mut wtr = WriterBuilder::new().from_writer(Vec::new());
    wtr.write_record(INTERVENTION_COLUMNS)?;
    for i in interventions {
        let target = state.resolve_target(&i.target);
        let date = |d: Option<chrono::NaiveDate>| d.map(|d| d.to_string()).unwrap_or_default();
        wtr.write_record([
            i.tender_code.clone(),
            i.title.clone(),
            i.subject.clone(),
            i.amount.to_string(),
            i.responsible.clone(),
            date(i.date_start),
            date(i.date_end),
            target.unique_code().unwrap_or_default().to_string(),
            i.kind.label().to_string(),
        ])?;
    }
    finish(wtr)
}
