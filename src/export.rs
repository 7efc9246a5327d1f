//! Excel workbook export (feature-gated behind `excel`).
//!
//! Writes one sheet per pipeline stage output: `Processed` (cleaned
//! activity), `Merged`, `Reshaped`, and `Summary`. The summary sheet also
//! carries the join-drop tallies so the workbook records what the inner
//! joins discarded.

use std::path::Path;

use rust_xlsxwriter::{Workbook, Worksheet};

use crate::error::PipelineResult;
use crate::model::columns;
use crate::processing::aggregate::InteractionSummary;
use crate::processing::clean::Cleaned;
use crate::processing::merge::MergeOutput;
use crate::model::ReshapedTable;

/// Write the four stage outputs as one workbook.
pub fn write_workbook(
    path: impl AsRef<Path>,
    cleaned: &Cleaned,
    merged: &MergeOutput,
    reshaped: &ReshapedTable,
    summary: &InteractionSummary,
) -> PipelineResult<()> {
    let mut workbook = Workbook::new();

    write_processed_sheet(workbook.add_worksheet(), cleaned)?;
    write_merged_sheet(workbook.add_worksheet(), merged)?;
    write_reshaped_sheet(workbook.add_worksheet(), reshaped)?;
    write_summary_sheet(workbook.add_worksheet(), cleaned, merged, summary)?;

    workbook.save(path.as_ref())?;
    Ok(())
}

fn write_header(ws: &mut Worksheet, names: &[&str]) -> PipelineResult<()> {
    for (col, name) in names.iter().enumerate() {
        ws.write_string(0, col as u16, *name)?;
    }
    Ok(())
}

fn write_processed_sheet(ws: &mut Worksheet, cleaned: &Cleaned) -> PipelineResult<()> {
    ws.set_name("Processed")?;
    write_header(
        ws,
        &[
            columns::USER_ID,
            columns::COMPONENT,
            columns::ACTION,
            columns::TARGET,
            columns::DATE,
        ],
    )?;
    for (i, rec) in cleaned.activity.iter().enumerate() {
        let row = i as u32 + 1;
        ws.write_number(row, 0, rec.user_id as f64)?;
        ws.write_string(row, 1, &rec.component)?;
        ws.write_string(row, 2, &rec.action)?;
        ws.write_string(row, 3, rec.target.as_deref().unwrap_or(""))?;
        ws.write_string(row, 4, rec.date.format("%Y-%m-%d").to_string())?;
    }
    Ok(())
}

fn write_merged_sheet(ws: &mut Worksheet, merged: &MergeOutput) -> PipelineResult<()> {
    ws.set_name("Merged")?;
    write_header(
        ws,
        &[
            columns::USER_ID,
            columns::CODE,
            columns::COMPONENT,
            columns::ACTION,
            columns::TARGET,
            columns::DATE,
            "Session_Date",
            "Session_Time",
        ],
    )?;
    for (i, rec) in merged.records.iter().enumerate() {
        let row = i as u32 + 1;
        ws.write_number(row, 0, rec.user_id as f64)?;
        ws.write_string(row, 1, &rec.code)?;
        ws.write_string(row, 2, &rec.component)?;
        ws.write_string(row, 3, &rec.action)?;
        ws.write_string(row, 4, rec.target.as_deref().unwrap_or(""))?;
        ws.write_string(row, 5, rec.date.format("%Y-%m-%d").to_string())?;
        ws.write_string(row, 6, rec.session_date.format("%Y-%m-%d").to_string())?;
        let time = rec
            .session_time
            .map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_default();
        ws.write_string(row, 7, time)?;
    }
    Ok(())
}

fn write_reshaped_sheet(ws: &mut Worksheet, reshaped: &ReshapedTable) -> PipelineResult<()> {
    ws.set_name("Reshaped")?;
    let mut header: Vec<&str> = vec![columns::USER_ID, "Bucket"];
    header.extend(reshaped.components.iter().map(String::as_str));
    header.push("Total_Interactions");
    write_header(ws, &header)?;

    for (i, r) in reshaped.rows.iter().enumerate() {
        let row = i as u32 + 1;
        ws.write_number(row, 0, r.user_id as f64)?;
        ws.write_string(row, 1, &r.bucket)?;
        for (j, count) in r.counts.iter().enumerate() {
            ws.write_number(row, j as u16 + 2, *count as f64)?;
        }
        ws.write_number(row, r.counts.len() as u16 + 2, r.total as f64)?;
    }
    Ok(())
}

fn write_summary_sheet(
    ws: &mut Worksheet,
    cleaned: &Cleaned,
    merged: &MergeOutput,
    summary: &InteractionSummary,
) -> PipelineResult<()> {
    ws.set_name("Summary")?;
    write_header(ws, &["Section", "Key", "Value"])?;

    let mut row: u32 = 1;
    let mut entry = |section: &str, key: &str, value: f64| -> PipelineResult<()> {
        ws.write_string(row, 0, section)?;
        ws.write_string(row, 1, key)?;
        ws.write_number(row, 2, value)?;
        row += 1;
        Ok(())
    };

    for (user_id, total) in &summary.user_totals {
        entry("User total", &user_id.to_string(), *total as f64)?;
    }
    for (component, total) in &summary.component_totals {
        entry("Component total", component, *total as f64)?;
    }
    for (bucket, total) in &summary.bucket_totals {
        entry("Bucket total", bucket, *total as f64)?;
    }
    if let Some(stats) = &summary.row_stats {
        entry("Stats", "Mean per user-bucket", stats.mean)?;
        entry("Stats", "Max per user-bucket", stats.max as f64)?;
    }
    entry("Stats", "Total interactions", summary.total_interactions as f64)?;

    let d = &merged.diagnostics;
    entry("Diagnostics", "Activity rows in", d.input_rows as f64)?;
    entry("Diagnostics", "Merged rows", d.merged_rows as f64)?;
    entry("Diagnostics", "Unmatched user rows", d.unmatched_user as f64)?;
    entry("Diagnostics", "Unmatched component rows", d.unmatched_component as f64)?;
    entry("Diagnostics", "Excluded rows removed", cleaned.excluded_rows as f64)?;

    Ok(())
}
