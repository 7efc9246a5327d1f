//! Stage-sequencing facade for the driving interface.
//!
//! The GUI (or any other driver) holds a [`Pipeline`] and calls one
//! operation per stage, passing each stage's output to the next. Every
//! operation validates its own preconditions and fails fast with a typed
//! error; when an observer is configured, per-stage row stats and
//! classified failures are reported to it, with `on_alert` fired at or
//! above a configurable severity threshold.

use std::fmt;
use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::ingestion::{self, PipelineObserver, RawTables, Severity, SourcePaths, Stage, StageContext, StageStats};
use crate::model::ReshapedTable;
use crate::processing::aggregate::{self, InteractionSummary};
use crate::processing::clean::{self, Cleaned};
use crate::processing::merge::{self, MergeOutput};
use crate::processing::reshape;

/// Options controlling pipeline behavior.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct PipelineOptions {
    /// Column renames, excluded components, bucket granularity.
    pub config: PipelineConfig,
    /// Optional observer for per-stage logging/alerts.
    pub observer: Option<Arc<dyn PipelineObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: Severity,
}

impl fmt::Debug for PipelineOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineOptions")
            .field("config", &self.config)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            config: PipelineConfig::default(),
            observer: None,
            alert_at_or_above: Severity::Critical,
        }
    }
}

/// All stage outputs of one full run, for drivers that want everything at
/// once rather than stepping stage by stage.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub cleaned: Cleaned,
    pub merged: MergeOutput,
    pub reshaped: ReshapedTable,
    pub summary: InteractionSummary,
}

/// The sequential batch pipeline over the three course-platform exports.
#[derive(Debug, Default)]
pub struct Pipeline {
    options: PipelineOptions,
}

impl Pipeline {
    /// Create a pipeline with explicit options.
    pub fn new(options: PipelineOptions) -> Self {
        Self { options }
    }

    /// Create a pipeline from a config, with no observer.
    pub fn with_config(config: PipelineConfig) -> Self {
        Self::new(PipelineOptions {
            config,
            ..PipelineOptions::default()
        })
    }

    /// The options this pipeline runs with.
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Load the three CSV sources into validated tables.
    pub fn load(&self, paths: &SourcePaths) -> PipelineResult<RawTables> {
        let result = ingestion::load_tables(paths);
        self.report(Stage::Load, &result, |raw| StageStats {
            rows_in: raw.total_rows(),
            rows_out: raw.total_rows(),
            rows_dropped: 0,
        });
        result
    }

    /// Rename columns, drop excluded-component rows, decode typed records.
    pub fn clean(&self, raw: &RawTables) -> PipelineResult<Cleaned> {
        let result = clean::clean_tables(raw, &self.options.config);
        let rows_in = raw.activity.row_count();
        self.report(Stage::Clean, &result, |cleaned| StageStats {
            rows_in,
            rows_out: cleaned.activity.len(),
            rows_dropped: cleaned.excluded_rows,
        });
        result
    }

    /// Join activity to user-session context and the component table.
    pub fn merge(&self, cleaned: &Cleaned) -> PipelineResult<MergeOutput> {
        let result = merge::merge_records(cleaned);
        self.report(Stage::Merge, &result, |out| StageStats {
            rows_in: out.diagnostics.input_rows,
            rows_out: out.diagnostics.merged_rows,
            rows_dropped: out.diagnostics.input_rows - out.diagnostics.merged_rows,
        });
        result
    }

    /// Pivot merged records into the wide analysis table.
    pub fn reshape(&self, merged: &MergeOutput, cleaned: &Cleaned) -> PipelineResult<ReshapedTable> {
        let result = reshape::reshape(
            &merged.records,
            &cleaned.catalog,
            self.options.config.granularity,
        );
        let rows_in = merged.records.len();
        self.report(Stage::Reshape, &result, |table| StageStats {
            rows_in,
            rows_out: table.rows.len(),
            rows_dropped: 0,
        });
        result
    }

    /// Compute interaction totals and descriptive statistics.
    pub fn aggregate(&self, reshaped: &ReshapedTable) -> PipelineResult<InteractionSummary> {
        let result = aggregate::aggregate(reshaped);
        let rows_in = reshaped.rows.len();
        self.report(Stage::Aggregate, &result, |summary| StageStats {
            rows_in,
            rows_out: summary.counts.len(),
            rows_dropped: 0,
        });
        result
    }

    /// Export all stage outputs as one Excel workbook.
    #[cfg(feature = "excel")]
    pub fn export(
        &self,
        path: impl AsRef<std::path::Path>,
        run: &PipelineRun,
    ) -> PipelineResult<()> {
        let result = crate::export::write_workbook(
            path,
            &run.cleaned,
            &run.merged,
            &run.reshaped,
            &run.summary,
        );
        let rows = run.merged.records.len();
        self.report(Stage::Export, &result, |_| StageStats {
            rows_in: rows,
            rows_out: rows,
            rows_dropped: 0,
        });
        result
    }

    /// Run every stage in order and return all outputs.
    pub fn run(&self, paths: &SourcePaths) -> PipelineResult<PipelineRun> {
        let raw = self.load(paths)?;
        let cleaned = self.clean(&raw)?;
        let merged = self.merge(&cleaned)?;
        let reshaped = self.reshape(&merged, &cleaned)?;
        let summary = self.aggregate(&reshaped)?;
        Ok(PipelineRun {
            cleaned,
            merged,
            reshaped,
            summary,
        })
    }

    fn report<T>(
        &self,
        stage: Stage,
        result: &PipelineResult<T>,
        stats: impl FnOnce(&T) -> StageStats,
    ) {
        let Some(observer) = self.options.observer.as_ref() else {
            return;
        };
        let ctx = StageContext { stage };
        match result {
            Ok(value) => observer.on_stage_success(&ctx, stats(value)),
            Err(error) => {
                let severity = severity_for_error(error);
                observer.on_stage_failure(&ctx, severity, error);
                if severity >= self.options.alert_at_or_above {
                    observer.on_alert(&ctx, severity, error);
                }
            }
        }
    }
}

fn severity_for_error(e: &PipelineError) -> Severity {
    match e {
        PipelineError::Io(_) => Severity::Critical,
        PipelineError::Csv(err) => match err.kind() {
            ::csv::ErrorKind::Io(_) => Severity::Critical,
            _ => Severity::Error,
        },
        _ => Severity::Error,
    }
}
