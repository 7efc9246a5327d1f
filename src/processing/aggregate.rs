//! Aggregation stage: interaction totals and descriptive statistics.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{PipelineError, PipelineResult};
use crate::model::ReshapedTable;

/// Mean and maximum of the per-row interaction totals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RowStats {
    /// Arithmetic mean of per-`(user, bucket)` totals.
    pub mean: f64,
    /// Largest per-`(user, bucket)` total.
    pub max: u64,
}

/// One long-form interaction count, the original groupby output shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InteractionCount {
    pub user_id: i64,
    pub component: String,
    pub bucket: String,
    pub count: u64,
}

/// Per-user and per-component aggregates derived from the reshaped table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InteractionSummary {
    /// Total interactions per user, across components and buckets.
    pub user_totals: BTreeMap<i64, u64>,
    /// Total interactions per component, across users and buckets.
    pub component_totals: BTreeMap<String, u64>,
    /// Total interactions per time bucket, across users.
    pub bucket_totals: BTreeMap<String, u64>,
    /// Mean/max of per-row totals; `None` when there are no rows.
    pub row_stats: Option<RowStats>,
    /// Non-zero `(user, component, bucket)` counts, in row order.
    pub counts: Vec<InteractionCount>,
    /// Grand total; equals the merged record count that was pivoted.
    pub total_interactions: u64,
}

/// Compute interaction totals and descriptive statistics.
///
/// Invariant: the per-user totals, the per-component totals, and the
/// per-bucket totals each sum to `total_interactions`.
pub fn aggregate(table: &ReshapedTable) -> PipelineResult<InteractionSummary> {
    let mut user_totals: BTreeMap<i64, u64> = BTreeMap::new();
    let mut component_totals: BTreeMap<String, u64> = BTreeMap::new();
    let mut bucket_totals: BTreeMap<String, u64> = BTreeMap::new();
    let mut counts: Vec<InteractionCount> = Vec::new();
    let mut total_interactions: u64 = 0;
    let mut max_row_total: u64 = 0;

    for (idx, row) in table.rows.iter().enumerate() {
        if row.counts.len() != table.components.len() {
            return Err(PipelineError::Aggregation {
                message: format!(
                    "row {} has {} cells but the table has {} component columns",
                    idx + 1,
                    row.counts.len(),
                    table.components.len()
                ),
            });
        }

        *user_totals.entry(row.user_id).or_default() += row.total;
        *bucket_totals.entry(row.bucket.clone()).or_default() += row.total;
        total_interactions += row.total;
        max_row_total = max_row_total.max(row.total);

        for (component, &count) in table.components.iter().zip(&row.counts) {
            *component_totals.entry(component.clone()).or_default() += count;
            if count > 0 {
                counts.push(InteractionCount {
                    user_id: row.user_id,
                    component: component.clone(),
                    bucket: row.bucket.clone(),
                    count,
                });
            }
        }
    }

    let row_stats = if table.rows.is_empty() {
        None
    } else {
        Some(RowStats {
            mean: total_interactions as f64 / table.rows.len() as f64,
            max: max_row_total,
        })
    };

    Ok(InteractionSummary {
        user_totals,
        component_totals,
        bucket_totals,
        row_stats,
        counts,
        total_interactions,
    })
}

#[cfg(test)]
mod tests {
    use super::aggregate;
    use crate::model::{ReshapedRow, ReshapedTable};

    fn row(user_id: i64, bucket: &str, counts: Vec<u64>) -> ReshapedRow {
        let total = counts.iter().sum();
        ReshapedRow {
            user_id,
            bucket: bucket.to_string(),
            counts,
            total,
        }
    }

    fn sample_table() -> ReshapedTable {
        ReshapedTable {
            components: vec!["Course".to_string(), "Quiz".to_string()],
            rows: vec![
                row(1, "2024-01", vec![2, 1]),
                row(1, "2024-02", vec![0, 4]),
                row(2, "2024-01", vec![1, 0]),
            ],
        }
    }

    #[test]
    fn totals_agree_across_groupings() {
        let summary = aggregate(&sample_table()).unwrap();

        assert_eq!(summary.total_interactions, 8);
        assert_eq!(summary.user_totals.values().sum::<u64>(), 8);
        assert_eq!(summary.component_totals.values().sum::<u64>(), 8);
        assert_eq!(summary.bucket_totals.values().sum::<u64>(), 8);

        assert_eq!(summary.user_totals[&1], 7);
        assert_eq!(summary.user_totals[&2], 1);
        assert_eq!(summary.component_totals["Quiz"], 5);
        assert_eq!(summary.bucket_totals["2024-01"], 4);
    }

    #[test]
    fn row_stats_cover_mean_and_max() {
        let summary = aggregate(&sample_table()).unwrap();
        let stats = summary.row_stats.unwrap();
        assert!((stats.mean - 8.0 / 3.0).abs() < 1e-9);
        assert_eq!(stats.max, 4);
    }

    #[test]
    fn empty_table_yields_no_stats_not_a_failure() {
        let table = ReshapedTable {
            components: vec!["Quiz".to_string()],
            rows: Vec::new(),
        };
        let summary = aggregate(&table).unwrap();
        assert_eq!(summary.total_interactions, 0);
        assert!(summary.row_stats.is_none());
        assert!(summary.counts.is_empty());
    }

    #[test]
    fn long_form_counts_skip_zero_cells() {
        let summary = aggregate(&sample_table()).unwrap();
        assert_eq!(summary.counts.len(), 4);
        assert!(summary.counts.iter().all(|c| c.count > 0));
        assert_eq!(summary.counts[0].component, "Course");
        assert_eq!(summary.counts[0].count, 2);
    }

    #[test]
    fn cell_arity_mismatch_is_an_aggregation_error() {
        let mut table = sample_table();
        table.rows[1].counts.pop();
        let err = aggregate(&table).unwrap_err();
        assert!(err.to_string().contains("aggregation error"));
    }
}
