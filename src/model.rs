//! Typed domain records produced by the cleaning stage and consumed by the
//! merge/reshape/aggregate stages.
//!
//! The loader keeps data in generic [`crate::types::Table`]s; once columns
//! are renamed to their canonical names the cleaner decodes each table into
//! the record types here. Downstream stages work on these records only, so
//! field access is checked at compile time instead of by string lookup.

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;

/// Canonical column names shared by the cleaner, the decode step, and the
/// workbook exporter. Source files may use different spellings; the
/// configured rename mapping translates them (e.g. the activity export's
/// `User Full Name *Anonymized` column becomes [`columns::USER_ID`]).
pub mod columns {
    pub const USER_ID: &str = "User_ID";
    pub const COMPONENT: &str = "Component";
    pub const ACTION: &str = "Action";
    pub const TARGET: &str = "Target";
    pub const DATE: &str = "Date";
    pub const TIME: &str = "Time";
    pub const CODE: &str = "Code";
    pub const CATEGORY: &str = "Category";

    /// Anonymized user column name as exported by the course platform.
    pub const SOURCE_USER: &str = "User Full Name *Anonymized";
}

/// One logged interaction from the activity export. Immutable once decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityRecord {
    /// Anonymized numeric user id.
    pub user_id: i64,
    /// Component reference code this interaction was logged against.
    pub component: String,
    /// Action verb (viewed, submitted, ...).
    pub action: String,
    /// Free-form action target, when the platform logged one.
    pub target: Option<String>,
    /// Day the interaction happened.
    pub date: NaiveDate,
}

/// One row of the user-session export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserLogEntry {
    /// Anonymized numeric user id.
    pub user_id: i64,
    /// Session day.
    pub date: NaiveDate,
    /// Session time-of-day, when present in the source.
    pub time: Option<NaiveTime>,
}

/// One entry of the component reference table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentCode {
    /// Reference code used by activity rows.
    pub code: String,
    /// Human-readable component name (pivot column label).
    pub name: String,
    /// Optional grouping category, when the source carries one.
    pub category: Option<String>,
    /// Whether this component is configured as system/noise and must be
    /// filtered from analysis.
    pub excluded: bool,
}

/// The component reference table, with code lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentCatalog {
    entries: Vec<ComponentCode>,
}

impl ComponentCatalog {
    /// Build a catalog from decoded reference entries.
    pub fn new(entries: Vec<ComponentCode>) -> Self {
        Self { entries }
    }

    /// All entries, in source order.
    pub fn entries(&self) -> &[ComponentCode] {
        &self.entries
    }

    /// Whether the catalog has no entries at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry by reference code.
    pub fn resolve(&self, code: &str) -> Option<&ComponentCode> {
        self.entries.iter().find(|c| c.code == code)
    }

    /// Names of all non-excluded components, sorted and deduplicated.
    ///
    /// This is the pivot column set of the reshape stage.
    pub fn active_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .entries
            .iter()
            .filter(|c| !c.excluded)
            .map(|c| c.name.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

/// Join of an [`ActivityRecord`] with its user-session context and resolved
/// component. One merged record per surviving activity record; duplicates in
/// the activity source stay duplicated here, since repeated logged
/// interactions are meaningful events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedRecord {
    pub user_id: i64,
    /// Component reference code from the activity row.
    pub code: String,
    /// Resolved component name from the catalog.
    pub component: String,
    pub action: String,
    pub target: Option<String>,
    /// Day of the interaction.
    pub date: NaiveDate,
    /// Day of the user-log session nearest to the interaction.
    pub session_date: NaiveDate,
    /// Time-of-day of that session, when the source carried one.
    pub session_time: Option<NaiveTime>,
}

/// One row of the wide-form pivot: a `(user, time bucket)` pair with one
/// count cell per known component column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReshapedRow {
    pub user_id: i64,
    /// Truncated timestamp, e.g. `"2024-01"` (monthly) or `"2024-01-05"`.
    pub bucket: String,
    /// Interaction counts, parallel to [`ReshapedTable::components`].
    pub counts: Vec<u64>,
    /// Sum of `counts`.
    pub total: u64,
}

/// Wide-form pivot of the merged record set.
///
/// Rows are the distinct `(user_id, bucket)` pairs present after filtering,
/// sorted by user then bucket; columns are the known non-excluded component
/// names. Every row carries a value for every column, zero where no merged
/// record matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReshapedTable {
    /// Pivot column labels, sorted.
    pub components: Vec<String>,
    /// Pivot rows, sorted by `(user_id, bucket)`.
    pub rows: Vec<ReshapedRow>,
}

impl ReshapedTable {
    /// Index of a component column, if known.
    pub fn column_index(&self, component: &str) -> Option<usize> {
        self.components.iter().position(|c| c == component)
    }

    /// Count cell for `(user_id, bucket, component)`, if the row and column
    /// exist.
    pub fn count_for(&self, user_id: i64, bucket: &str, component: &str) -> Option<u64> {
        let col = self.column_index(component)?;
        self.rows
            .iter()
            .find(|r| r.user_id == user_id && r.bucket == bucket)
            .map(|r| r.counts[col])
    }
}
