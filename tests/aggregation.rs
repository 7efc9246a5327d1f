use course_engagement::config::PipelineConfig;
use course_engagement::ingestion::{load_tables, SourcePaths};
use course_engagement::processing::aggregate::aggregate;
use course_engagement::processing::clean::clean_tables;
use course_engagement::processing::merge::merge_records;
use course_engagement::processing::reshape::reshape;

fn fixture_paths() -> SourcePaths {
    SourcePaths::new(
        "tests/fixtures/ACTIVITY_LOG.csv",
        "tests/fixtures/USER_LOG.csv",
        "tests/fixtures/COMPONENT_CODES.csv",
    )
}

#[test]
fn totals_agree_with_the_merged_record_count() {
    let raw = load_tables(&fixture_paths()).unwrap();
    let config = PipelineConfig::default();
    let cleaned = clean_tables(&raw, &config).unwrap();
    let merged = merge_records(&cleaned).unwrap();
    let table = reshape(&merged.records, &cleaned.catalog, config.granularity).unwrap();
    let summary = aggregate(&table).unwrap();

    let merged_count = merged.records.len() as u64;
    assert_eq!(summary.total_interactions, merged_count);
    assert_eq!(summary.user_totals.values().sum::<u64>(), merged_count);
    assert_eq!(summary.component_totals.values().sum::<u64>(), merged_count);
    assert_eq!(summary.bucket_totals.values().sum::<u64>(), merged_count);
}

#[test]
fn fixture_summary_values() {
    let raw = load_tables(&fixture_paths()).unwrap();
    let config = PipelineConfig::default();
    let cleaned = clean_tables(&raw, &config).unwrap();
    let merged = merge_records(&cleaned).unwrap();
    let table = reshape(&merged.records, &cleaned.catalog, config.granularity).unwrap();
    let summary = aggregate(&table).unwrap();

    assert_eq!(summary.user_totals[&1], 2);
    assert_eq!(summary.user_totals[&2], 2);
    assert_eq!(summary.component_totals["Quiz"], 2);
    assert_eq!(summary.component_totals["Wiki"], 1);
    // Known component with no surviving interactions still appears, at zero.
    assert_eq!(summary.component_totals["Assignment"], 0);
    assert_eq!(summary.bucket_totals["2024-01"], 3);
    assert_eq!(summary.bucket_totals["2024-02"], 1);

    let stats = summary.row_stats.unwrap();
    assert_eq!(stats.max, 2);
    assert!((stats.mean - 4.0 / 3.0).abs() < 1e-9);
}

#[test]
fn long_form_counts_mirror_the_pivot() {
    let raw = load_tables(&fixture_paths()).unwrap();
    let config = PipelineConfig::default();
    let cleaned = clean_tables(&raw, &config).unwrap();
    let merged = merge_records(&cleaned).unwrap();
    let table = reshape(&merged.records, &cleaned.catalog, config.granularity).unwrap();
    let summary = aggregate(&table).unwrap();

    assert_eq!(
        summary.counts.iter().map(|c| c.count).sum::<u64>(),
        summary.total_interactions
    );
    for c in &summary.counts {
        assert_eq!(table.count_for(c.user_id, &c.bucket, &c.component), Some(c.count));
    }
}
