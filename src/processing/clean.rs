//! Cleaning stage: column renames, excluded-component removal, typed decode.
//!
//! Renames run first so every table exposes the canonical column names in
//! [`crate::model::columns`]; the excluded-component filter then drops
//! activity rows resolving to flagged catalog entries (a stable filter:
//! surviving rows keep their input order); finally each table is decoded
//! into its typed record form. All decode failures surface as
//! [`PipelineError::Schema`] before any downstream stage runs.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveTime;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::ingestion::RawTables;
use crate::model::{columns, ActivityRecord, ComponentCatalog, ComponentCode, UserLogEntry};
use crate::types::{Table, Value};

/// Output of the cleaning stage: typed, filtered record sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cleaned {
    /// Activity records with excluded components removed, in source order.
    pub activity: Vec<ActivityRecord>,
    /// User-session entries, in source order.
    pub sessions: Vec<UserLogEntry>,
    /// Full component reference table, including excluded entries (flagged).
    pub catalog: ComponentCatalog,
    /// Number of activity rows removed by the excluded-component filter.
    pub excluded_rows: usize,
}

/// Rename columns per the configured source-name to canonical-name mapping.
///
/// Columns not present in the mapping keep their names. Fails when the
/// renamed schema would contain a duplicate column name.
pub fn rename_columns(table: &Table, renames: &BTreeMap<String, String>) -> PipelineResult<Table> {
    let mut out = table.clone();
    let mut seen: HashSet<&str> = HashSet::new();
    for field in &mut out.schema.fields {
        if let Some(target) = renames.get(&field.name) {
            field.name = target.clone();
        }
    }
    for field in &out.schema.fields {
        if !seen.insert(field.name.as_str()) {
            return Err(PipelineError::Schema {
                message: format!(
                    "column rename target '{}' collides with an existing column",
                    field.name
                ),
            });
        }
    }
    Ok(out)
}

/// Run the full cleaning stage over the three loaded tables.
pub fn clean_tables(raw: &RawTables, config: &PipelineConfig) -> PipelineResult<Cleaned> {
    let activity = rename_columns(&raw.activity, &config.column_renames)?;
    let user_log = rename_columns(&raw.user_log, &config.column_renames)?;
    let component_codes = rename_columns(&raw.component_codes, &config.column_renames)?;

    let catalog = decode_components(&component_codes, config)?;

    let component_idx = require_column(&activity, columns::COMPONENT)?;
    let filtered = activity.filter_rows(|row| {
        let code = row[component_idx].as_str().unwrap_or("");
        !matches!(catalog.resolve(code), Some(c) if c.excluded)
    });
    let excluded_rows = activity.row_count() - filtered.row_count();

    Ok(Cleaned {
        activity: decode_activity(&filtered)?,
        sessions: decode_sessions(&user_log)?,
        catalog,
        excluded_rows,
    })
}

fn require_column(table: &Table, name: &str) -> PipelineResult<usize> {
    table
        .schema
        .index_of(name)
        .ok_or_else(|| PipelineError::Schema {
            message: format!("missing column '{name}' after rename; check the column_renames config"),
        })
}

fn decode_activity(table: &Table) -> PipelineResult<Vec<ActivityRecord>> {
    let user = require_column(table, columns::USER_ID)?;
    let component = require_column(table, columns::COMPONENT)?;
    let action = require_column(table, columns::ACTION)?;
    let target = require_column(table, columns::TARGET)?;
    let date = require_column(table, columns::DATE)?;

    let mut records = Vec::with_capacity(table.row_count());
    for (idx, row) in table.rows.iter().enumerate() {
        records.push(ActivityRecord {
            user_id: req_i64(&row[user], idx, columns::USER_ID)?,
            component: req_str(&row[component], idx, columns::COMPONENT)?,
            action: req_str(&row[action], idx, columns::ACTION)?,
            target: opt_str(&row[target], idx, columns::TARGET)?,
            date: req_date(&row[date], idx, columns::DATE)?,
        });
    }
    Ok(records)
}

fn decode_sessions(table: &Table) -> PipelineResult<Vec<UserLogEntry>> {
    let user = require_column(table, columns::USER_ID)?;
    let date = require_column(table, columns::DATE)?;
    let time = require_column(table, columns::TIME)?;

    let mut entries = Vec::with_capacity(table.row_count());
    for (idx, row) in table.rows.iter().enumerate() {
        entries.push(UserLogEntry {
            user_id: req_i64(&row[user], idx, columns::USER_ID)?,
            date: req_date(&row[date], idx, columns::DATE)?,
            time: parse_time(&row[time], idx)?,
        });
    }
    Ok(entries)
}

fn decode_components(table: &Table, config: &PipelineConfig) -> PipelineResult<ComponentCatalog> {
    let name = require_column(table, columns::COMPONENT)?;
    let code = require_column(table, columns::CODE)?;
    let category = table.schema.index_of(columns::CATEGORY);

    let mut entries = Vec::with_capacity(table.row_count());
    for (idx, row) in table.rows.iter().enumerate() {
        let code = req_str(&row[code], idx, columns::CODE)?;
        let name = req_str(&row[name], idx, columns::COMPONENT)?;
        // The configured exclusion set may name either the code or the
        // display name; match both.
        let excluded = config.is_excluded(&code) || config.is_excluded(&name);
        entries.push(ComponentCode {
            code,
            name,
            category: match category {
                Some(cat) => opt_str(&row[cat], idx, columns::CATEGORY)?,
                None => None,
            },
            excluded,
        });
    }
    Ok(ComponentCatalog::new(entries))
}

fn decode_err(row: usize, column: &str, expected: &str, value: &Value) -> PipelineError {
    PipelineError::Schema {
        message: format!(
            "row {}: expected {expected} in column '{column}', got {value:?}",
            row + 1
        ),
    }
}

fn req_i64(value: &Value, row: usize, column: &str) -> PipelineResult<i64> {
    value
        .as_i64()
        .ok_or_else(|| decode_err(row, column, "an integer", value))
}

fn req_str(value: &Value, row: usize, column: &str) -> PipelineResult<String> {
    value
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| decode_err(row, column, "text", value))
}

fn opt_str(value: &Value, row: usize, column: &str) -> PipelineResult<Option<String>> {
    if value.is_null() {
        return Ok(None);
    }
    req_str(value, row, column).map(Some)
}

fn req_date(value: &Value, row: usize, column: &str) -> PipelineResult<chrono::NaiveDate> {
    value
        .as_date()
        .ok_or_else(|| decode_err(row, column, "a date", value))
}

fn parse_time(value: &Value, row: usize) -> PipelineResult<Option<NaiveTime>> {
    if value.is_null() {
        return Ok(None);
    }
    let raw = req_str(value, row, columns::TIME)?;

    for fmt in ["%H:%M:%S", "%H:%M"] {
        if let Ok(t) = NaiveTime::parse_from_str(&raw, fmt) {
            return Ok(Some(t));
        }
    }
    Err(PipelineError::Schema {
        message: format!("row {}: unrecognized time-of-day '{raw}'", row + 1),
    })
}

#[cfg(test)]
mod tests {
    use super::rename_columns;
    use crate::types::{DataType, Field, Schema, Table, Value};
    use std::collections::BTreeMap;

    fn table(names: &[&str]) -> Table {
        let fields = names
            .iter()
            .map(|n| Field::new(*n, DataType::Utf8))
            .collect();
        Table::new(Schema::new(fields), vec![vec![Value::Null; names.len()]])
    }

    fn renames(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect()
    }

    #[test]
    fn rename_maps_source_names_and_keeps_others() {
        let t = table(&["User Full Name *Anonymized", "Component"]);
        let out = rename_columns(&t, &renames(&[("User Full Name *Anonymized", "User_ID")])).unwrap();
        let names: Vec<_> = out.schema.field_names().collect();
        assert_eq!(names, vec!["User_ID", "Component"]);
        // Rows are carried over unchanged.
        assert_eq!(out.rows, t.rows);
    }

    #[test]
    fn rename_collision_is_a_schema_error() {
        let t = table(&["Old", "User_ID"]);
        let err = rename_columns(&t, &renames(&[("Old", "User_ID")])).unwrap_err();
        assert!(err.to_string().contains("collides"));
    }

    #[test]
    fn rename_with_empty_mapping_is_identity() {
        let t = table(&["A", "B"]);
        let out = rename_columns(&t, &BTreeMap::new()).unwrap();
        assert_eq!(out, t);
    }
}
