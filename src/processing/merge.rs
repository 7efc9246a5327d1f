//! Merge stage: join activity records to user-session context and to the
//! component reference table.
//!
//! Both joins are inner joins and are independent of each other: an
//! activity record survives iff its user has at least one user-log entry
//! *and* its code resolves to a known, non-excluded component. Because the
//! two checks share no keys, applying them in either order yields the same
//! merged set. Rows failing a join are dropped and tallied. Partial data
//! loss through inner joins is expected behavior and must stay visible to
//! the operator, but it is not an error.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{PipelineError, PipelineResult};
use crate::model::{MergedRecord, UserLogEntry};
use crate::processing::clean::Cleaned;

/// Tallies of rows dropped by the merge joins.
///
/// A record missing both joins increments both tallies, so the tallies can
/// sum to more than `input_rows - merged_rows`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JoinDiagnostics {
    /// Activity rows consumed.
    pub input_rows: usize,
    /// Merged records produced.
    pub merged_rows: usize,
    /// Activity rows whose user had no user-log entry.
    pub unmatched_user: usize,
    /// Activity rows whose code resolved to no known, non-excluded
    /// component.
    pub unmatched_component: usize,
}

/// Output of the merge stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutput {
    /// One record per surviving activity row, in input order. Duplicate
    /// activity rows stay duplicated.
    pub records: Vec<MergedRecord>,
    /// Drop tallies for operator display.
    pub diagnostics: JoinDiagnostics,
}

/// Join the cleaned record sets into the merged record set.
///
/// Session context for each surviving record is the user-log entry nearest
/// in date to the interaction (the earlier entry wins a tie).
pub fn merge_records(cleaned: &Cleaned) -> PipelineResult<MergeOutput> {
    if cleaned.catalog.is_empty() && !cleaned.activity.is_empty() {
        return Err(PipelineError::Join {
            message: "component reference table is empty; activity codes cannot resolve".to_string(),
        });
    }

    let mut sessions_by_user: BTreeMap<i64, Vec<&UserLogEntry>> = BTreeMap::new();
    for entry in &cleaned.sessions {
        sessions_by_user.entry(entry.user_id).or_default().push(entry);
    }

    let mut diagnostics = JoinDiagnostics {
        input_rows: cleaned.activity.len(),
        ..JoinDiagnostics::default()
    };
    let mut records = Vec::with_capacity(cleaned.activity.len());

    for activity in &cleaned.activity {
        let component = cleaned
            .catalog
            .resolve(&activity.component)
            .filter(|c| !c.excluded);
        let session = sessions_by_user
            .get(&activity.user_id)
            .and_then(|entries| nearest_session(entries, activity.date));

        if component.is_none() {
            diagnostics.unmatched_component += 1;
        }
        if session.is_none() {
            diagnostics.unmatched_user += 1;
        }
        let (Some(component), Some(session)) = (component, session) else {
            continue;
        };

        records.push(MergedRecord {
            user_id: activity.user_id,
            code: activity.component.clone(),
            component: component.name.clone(),
            action: activity.action.clone(),
            target: activity.target.clone(),
            date: activity.date,
            session_date: session.date,
            session_time: session.time,
        });
    }

    diagnostics.merged_rows = records.len();
    Ok(MergeOutput {
        records,
        diagnostics,
    })
}

/// The user-log entry nearest in date to `date`; the earlier entry wins a
/// tie, so the choice is deterministic regardless of source order.
fn nearest_session<'a>(entries: &[&'a UserLogEntry], date: chrono::NaiveDate) -> Option<&'a UserLogEntry> {
    entries
        .iter()
        .copied()
        .min_by_key(|e| ((e.date - date).num_days().abs(), e.date))
}
