//! CSV loading implementation.

use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{PipelineError, PipelineResult};
use crate::types::{DataType, Field, Schema, Table, Value};

use super::TableKind;

/// Date formats accepted in source cells. The platform exports ISO dates;
/// older exports used day-first slashed dates. Datetime forms are truncated
/// to their date part.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%d/%m/%Y %H:%M"];

/// Load one CSV source into an in-memory [`Table`].
///
/// Rules:
///
/// - The CSV must have a header row.
/// - Headers must contain every required column of `kind` (order can
///   differ); optional columns are ingested when present.
/// - Each cell is parsed according to the expected column type; empty cells
///   become [`Value::Null`].
/// - A header-only file yields a valid zero-row table.
pub fn read_table_from_path(path: impl AsRef<Path>, kind: TableKind) -> PipelineResult<Table> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)?;
    read_table_from_reader(&mut rdr, kind)
}

/// Load CSV data from an existing CSV reader.
pub fn read_table_from_reader<R: std::io::Read>(
    rdr: &mut csv::Reader<R>,
    kind: TableKind,
) -> PipelineResult<Table> {
    let headers = rdr.headers()?.clone();

    // Map table fields -> CSV column indexes (allows re-ordered CSV columns).
    let mut fields: Vec<Field> = Vec::new();
    let mut col_idxs: Vec<usize> = Vec::new();
    for field in kind.required_fields() {
        match headers.iter().position(|h| h.trim() == field.name) {
            Some(idx) => {
                col_idxs.push(idx);
                fields.push(field);
            }
            None => {
                return Err(PipelineError::Load {
                    table: kind.source_name().to_string(),
                    message: format!(
                        "missing required column '{name}'. headers={:?}",
                        headers.iter().collect::<Vec<_>>(),
                        name = field.name
                    ),
                });
            }
        }
    }
    for field in kind.optional_fields() {
        if let Some(idx) = headers.iter().position(|h| h.trim() == field.name) {
            col_idxs.push(idx);
            fields.push(field);
        }
    }

    let schema = Schema::new(fields);
    let mut rows: Vec<Vec<Value>> = Vec::new();
    for (row_idx0, result) in rdr.records().enumerate() {
        // Report 1-based row number for users; +1 again because header is row 1.
        let user_row = row_idx0 + 2;
        let record = result?;

        let mut row: Vec<Value> = Vec::with_capacity(schema.fields.len());
        for (field, &csv_idx) in schema.fields.iter().zip(col_idxs.iter()) {
            let raw = record.get(csv_idx).unwrap_or("");
            row.push(parse_typed_value(user_row, &field.name, &field.data_type, raw)?);
        }
        rows.push(row);
    }

    Ok(Table::new(schema, rows))
}

fn parse_typed_value(
    row: usize,
    column: &str,
    data_type: &DataType,
    raw: &str,
) -> PipelineResult<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Value::Null);
    }

    match data_type {
        DataType::Utf8 => Ok(Value::Utf8(trimmed.to_owned())),
        DataType::Int64 => trimmed.parse::<i64>().map(Value::Int64).map_err(|e| {
            PipelineError::Parse {
                row,
                column: column.to_owned(),
                raw: raw.to_owned(),
                message: e.to_string(),
            }
        }),
        DataType::Float64 => trimmed.parse::<f64>().map(Value::Float64).map_err(|e| {
            PipelineError::Parse {
                row,
                column: column.to_owned(),
                raw: raw.to_owned(),
                message: e.to_string(),
            }
        }),
        DataType::Bool => parse_bool(trimmed).map(Value::Bool).map_err(|message| {
            PipelineError::Parse {
                row,
                column: column.to_owned(),
                raw: raw.to_owned(),
                message,
            }
        }),
        DataType::Date => parse_date(trimmed).map(Value::Date).map_err(|message| {
            PipelineError::Parse {
                row,
                column: column.to_owned(),
                raw: raw.to_owned(),
                message,
            }
        }),
    }
}

fn parse_bool(s: &str) -> Result<bool, String> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "y" => Ok(true),
        "false" | "f" | "0" | "no" | "n" => Ok(false),
        _ => Err("expected bool (true/false/1/0/yes/no)".to_string()),
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }
    Err(format!(
        "expected a date (accepted formats: {})",
        DATE_FORMATS.join(", ")
    ))
}

#[cfg(test)]
mod tests {
    use super::parse_date;
    use chrono::NaiveDate;

    #[test]
    fn parse_date_accepts_iso_and_slashed_forms() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(parse_date("2024-01-05"), Ok(expected));
        assert_eq!(parse_date("05/01/2024"), Ok(expected));
        assert_eq!(parse_date("2024-01-05 10:30:00"), Ok(expected));
        assert_eq!(parse_date("05/01/2024 10:30"), Ok(expected));
    }

    #[test]
    fn parse_date_rejects_garbage() {
        assert!(parse_date("not a date").is_err());
        assert!(parse_date("2024-13-05").is_err());
    }
}
