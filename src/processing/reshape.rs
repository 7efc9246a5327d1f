//! Reshape stage: pivot the merged record set into the wide analysis table.

use std::collections::BTreeMap;

use crate::config::BucketGranularity;
use crate::error::{PipelineError, PipelineResult};
use crate::model::{ComponentCatalog, MergedRecord, ReshapedRow, ReshapedTable};

/// Pivot merged records into one row per `(user, time bucket)` and one
/// column per known non-excluded component.
///
/// Each record's date is truncated to `granularity` to form the bucket key.
/// Cells count the matching records; combinations with no record are filled
/// with 0, so every row carries a value for every column. Rows come out
/// sorted by user id, then bucket.
///
/// Fails with [`PipelineError::Reshape`] when the pivot would produce zero
/// rows (e.g. upstream filtering removed all data).
pub fn reshape(
    records: &[MergedRecord],
    catalog: &ComponentCatalog,
    granularity: BucketGranularity,
) -> PipelineResult<ReshapedTable> {
    if records.is_empty() {
        return Err(PipelineError::Reshape {
            message: "no merged records to pivot".to_string(),
        });
    }

    let components = catalog.active_names();
    let column_of: BTreeMap<&str, usize> = components
        .iter()
        .enumerate()
        .map(|(i, name)| (name.as_str(), i))
        .collect();

    let mut cells: BTreeMap<(i64, String), Vec<u64>> = BTreeMap::new();
    for record in records {
        let col = *column_of
            .get(record.component.as_str())
            .ok_or_else(|| PipelineError::Reshape {
                message: format!(
                    "merged record references component '{}' missing from the reference table",
                    record.component
                ),
            })?;
        let key = (record.user_id, granularity.bucket(record.date));
        cells.entry(key).or_insert_with(|| vec![0; components.len()])[col] += 1;
    }

    let rows = cells
        .into_iter()
        .map(|((user_id, bucket), counts)| {
            let total = counts.iter().sum();
            ReshapedRow {
                user_id,
                bucket,
                counts,
                total,
            }
        })
        .collect();

    Ok(ReshapedTable { components, rows })
}

#[cfg(test)]
mod tests {
    use super::reshape;
    use crate::config::BucketGranularity;
    use crate::model::{ComponentCatalog, ComponentCode, MergedRecord};
    use chrono::NaiveDate;

    fn record(user_id: i64, component: &str, day: u32) -> MergedRecord {
        let date = NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
        MergedRecord {
            user_id,
            code: component.to_string(),
            component: component.to_string(),
            action: "viewed".to_string(),
            target: None,
            date,
            session_date: date,
            session_time: None,
        }
    }

    fn catalog(names: &[&str]) -> ComponentCatalog {
        ComponentCatalog::new(
            names
                .iter()
                .map(|n| ComponentCode {
                    code: n.to_string(),
                    name: n.to_string(),
                    category: None,
                    excluded: false,
                })
                .collect(),
        )
    }

    #[test]
    fn empty_input_is_a_reshape_error() {
        let err = reshape(&[], &catalog(&["Quiz"]), BucketGranularity::Month).unwrap_err();
        assert!(err.to_string().contains("reshape error"));
    }

    #[test]
    fn pivot_counts_and_zero_fills() {
        let records = vec![
            record(1, "Quiz", 5),
            record(1, "Quiz", 9),
            record(1, "Course", 5),
        ];
        let table = reshape(&records, &catalog(&["Quiz", "Course", "Assignment"]), BucketGranularity::Month)
            .unwrap();

        // Columns are sorted.
        assert_eq!(table.components, vec!["Assignment", "Course", "Quiz"]);
        assert_eq!(table.rows.len(), 1);
        let row = &table.rows[0];
        assert_eq!((row.user_id, row.bucket.as_str()), (1, "2024-01"));
        assert_eq!(row.counts, vec![0, 1, 2]);
        assert_eq!(row.total, 3);
    }

    #[test]
    fn day_granularity_separates_buckets() {
        let records = vec![record(1, "Quiz", 5), record(1, "Quiz", 9)];
        let table = reshape(&records, &catalog(&["Quiz"]), BucketGranularity::Day).unwrap();
        let buckets: Vec<_> = table.rows.iter().map(|r| r.bucket.as_str()).collect();
        assert_eq!(buckets, vec!["2024-01-05", "2024-01-09"]);
    }

    #[test]
    fn rows_are_sorted_by_user_then_bucket() {
        let records = vec![
            record(2, "Quiz", 5),
            record(1, "Quiz", 9),
            record(1, "Quiz", 5),
        ];
        let table = reshape(&records, &catalog(&["Quiz"]), BucketGranularity::Day).unwrap();
        let keys: Vec<_> = table
            .rows
            .iter()
            .map(|r| (r.user_id, r.bucket.clone()))
            .collect();
        assert_eq!(
            keys,
            vec![
                (1, "2024-01-05".to_string()),
                (1, "2024-01-09".to_string()),
                (2, "2024-01-05".to_string()),
            ]
        );
    }
}
