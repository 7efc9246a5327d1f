use chrono::NaiveDate;
use criterion::{criterion_group, criterion_main, Criterion};

use course_engagement::config::BucketGranularity;
use course_engagement::model::{ActivityRecord, ComponentCatalog, ComponentCode, UserLogEntry};
use course_engagement::processing::aggregate::aggregate;
use course_engagement::processing::clean::Cleaned;
use course_engagement::processing::merge::merge_records;
use course_engagement::processing::reshape::reshape;

const COMPONENTS: &[&str] = &["Quiz", "Course", "Assignment", "Wiki", "Forum", "Book"];

fn synthetic_cleaned(rows: usize, users: i64) -> Cleaned {
    let activity = (0..rows)
        .map(|i| {
            let day = (i % 27) as u32 + 1;
            let month = (i % 3) as u32 + 1;
            ActivityRecord {
                user_id: i as i64 % users,
                component: COMPONENTS[i % COMPONENTS.len()].to_string(),
                action: "viewed".to_string(),
                target: None,
                date: NaiveDate::from_ymd_opt(2024, month, day).unwrap(),
            }
        })
        .collect();

    let sessions = (0..users)
        .map(|u| UserLogEntry {
            user_id: u,
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            time: None,
        })
        .collect();

    let catalog = ComponentCatalog::new(
        COMPONENTS
            .iter()
            .map(|n| ComponentCode {
                code: n.to_string(),
                name: n.to_string(),
                category: None,
                excluded: false,
            })
            .collect(),
    );

    Cleaned {
        activity,
        sessions,
        catalog,
        excluded_rows: 0,
    }
}

fn bench_stages(c: &mut Criterion) {
    let cleaned = synthetic_cleaned(10_000, 50);

    c.bench_function("merge_10k", |b| {
        b.iter(|| merge_records(&cleaned).unwrap())
    });

    let merged = merge_records(&cleaned).unwrap();
    c.bench_function("reshape_10k", |b| {
        b.iter(|| reshape(&merged.records, &cleaned.catalog, BucketGranularity::Month).unwrap())
    });

    let table = reshape(&merged.records, &cleaned.catalog, BucketGranularity::Month).unwrap();
    c.bench_function("aggregate_10k", |b| b.iter(|| aggregate(&table).unwrap()));
}

criterion_group!(benches, bench_stages);
criterion_main!(benches);
