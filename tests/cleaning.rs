use std::collections::BTreeMap;

use course_engagement::config::PipelineConfig;
use course_engagement::ingestion::{load_tables, SourcePaths};
use course_engagement::processing::clean::{clean_tables, rename_columns};
use course_engagement::types::{DataType, Field, Schema, Table, Value};

fn fixture_paths() -> SourcePaths {
    SourcePaths::new(
        "tests/fixtures/ACTIVITY_LOG.csv",
        "tests/fixtures/USER_LOG.csv",
        "tests/fixtures/COMPONENT_CODES.csv",
    )
}

#[test]
fn clean_removes_excluded_components_and_keeps_order() {
    let raw = load_tables(&fixture_paths()).unwrap();
    let cleaned = clean_tables(&raw, &PipelineConfig::default()).unwrap();

    // One System row in the fixture; Folder never appears.
    assert_eq!(cleaned.excluded_rows, 1);
    assert_eq!(cleaned.activity.len(), raw.activity.row_count() - 1);
    assert!(cleaned.activity.iter().all(|r| r.component != "System"));

    // Stable filter: surviving rows keep their source order.
    let components: Vec<_> = cleaned.activity.iter().map(|r| r.component.as_str()).collect();
    assert_eq!(components, vec!["Quiz", "Course", "Quiz", "Wiki", "Quiz", "Badge"]);
}

#[test]
fn clean_decodes_typed_records() {
    let raw = load_tables(&fixture_paths()).unwrap();
    let cleaned = clean_tables(&raw, &PipelineConfig::default()).unwrap();

    let first = &cleaned.activity[0];
    assert_eq!(first.user_id, 1);
    assert_eq!(first.action, "Course module viewed");
    assert_eq!(first.target.as_deref(), Some("Quiz 1"));

    // Empty Target cell decodes to None rather than a placeholder.
    assert_eq!(cleaned.activity[1].target, None);

    let session = &cleaned.sessions[0];
    assert_eq!(session.user_id, 1);
    assert_eq!(session.time.unwrap().to_string(), "09:12:35");

    // Catalog keeps excluded entries, flagged.
    assert_eq!(cleaned.catalog.entries().len(), 6);
    let system = cleaned.catalog.resolve("System").unwrap();
    assert!(system.excluded);
    let quiz = cleaned.catalog.resolve("Quiz").unwrap();
    assert!(!quiz.excluded);
}

#[test]
fn unknown_codes_survive_cleaning_for_the_merger_to_tally() {
    let raw = load_tables(&fixture_paths()).unwrap();
    let cleaned = clean_tables(&raw, &PipelineConfig::default()).unwrap();
    assert!(cleaned.activity.iter().any(|r| r.component == "Badge"));
}

#[test]
fn rename_collision_fails_with_schema_error() {
    let schema = Schema::new(vec![
        Field::new("User Full Name *Anonymized", DataType::Int64),
        Field::new("User_ID", DataType::Int64),
    ]);
    let table = Table::new(schema, vec![vec![Value::Int64(1), Value::Int64(2)]]);

    let mut renames = BTreeMap::new();
    renames.insert(
        "User Full Name *Anonymized".to_string(),
        "User_ID".to_string(),
    );
    let err = rename_columns(&table, &renames).unwrap_err();
    assert!(err.to_string().contains("schema error"));
    assert!(err.to_string().contains("User_ID"));
}

#[test]
fn custom_excluded_set_is_honored() {
    let raw = load_tables(&fixture_paths()).unwrap();
    let config = PipelineConfig {
        excluded_components: ["Quiz".to_string()].into_iter().collect(),
        ..PipelineConfig::default()
    };
    let cleaned = clean_tables(&raw, &config).unwrap();

    assert_eq!(cleaned.excluded_rows, 3);
    assert!(cleaned.activity.iter().all(|r| r.component != "Quiz"));
    // System is no longer excluded under the custom set.
    assert!(cleaned.activity.iter().any(|r| r.component == "System"));
}
