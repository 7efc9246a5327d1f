use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::PipelineError;

/// Severity classification used for observer callbacks and alerting
/// thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal).
    Warning,
    /// Error-level event (stage failed).
    Error,
    /// Critical error (typically I/O or other infrastructure failures).
    Critical,
}

/// The pipeline stage an observer event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Load,
    Clean,
    Merge,
    Reshape,
    Aggregate,
    Export,
}

impl Stage {
    /// Stable lowercase name used in log lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Clean => "clean",
            Self::Merge => "merge",
            Self::Reshape => "reshape",
            Self::Aggregate => "aggregate",
            Self::Export => "export",
        }
    }
}

/// Context about a stage execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageContext {
    /// Which stage ran.
    pub stage: Stage,
}

/// Row-count stats reported on successful stage completion.
///
/// `rows_dropped` makes partial data loss visible to the operator: excluded
/// components removed by the cleaner, unmatched rows dropped by the merge
/// joins. Dropped rows are expected behavior, not an error condition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct StageStats {
    /// Rows the stage consumed.
    pub rows_in: usize,
    /// Rows the stage produced.
    pub rows_out: usize,
    /// Rows the stage intentionally dropped.
    pub rows_dropped: usize,
}

/// Observer interface for pipeline stage outcomes.
///
/// Implementors can record metrics, logs, or trigger alerts. The driving
/// interface typically installs one to display per-stage progress and drop
/// counts.
pub trait PipelineObserver: Send + Sync {
    /// Called when a stage completes.
    fn on_stage_success(&self, _ctx: &StageContext, _stats: StageStats) {}

    /// Called when a stage fails.
    fn on_stage_failure(&self, _ctx: &StageContext, _severity: Severity, _error: &PipelineError) {}

    /// Called when a stage failure meets an alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_stage_failure`].
    fn on_alert(&self, ctx: &StageContext, severity: Severity, error: &PipelineError) {
        self.on_stage_failure(ctx, severity, error)
    }
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn PipelineObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn PipelineObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl PipelineObserver for CompositeObserver {
    fn on_stage_success(&self, ctx: &StageContext, stats: StageStats) {
        for o in &self.observers {
            o.on_stage_success(ctx, stats);
        }
    }

    fn on_stage_failure(&self, ctx: &StageContext, severity: Severity, error: &PipelineError) {
        for o in &self.observers {
            o.on_stage_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &StageContext, severity: Severity, error: &PipelineError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }
}

/// Logs stage events to stderr.
#[derive(Debug, Default)]
pub struct StdErrObserver;

impl PipelineObserver for StdErrObserver {
    fn on_stage_success(&self, ctx: &StageContext, stats: StageStats) {
        eprintln!(
            "[pipeline][ok] stage={} rows_in={} rows_out={} dropped={}",
            ctx.stage.as_str(),
            stats.rows_in,
            stats.rows_out,
            stats.rows_dropped
        );
    }

    fn on_stage_failure(&self, ctx: &StageContext, severity: Severity, error: &PipelineError) {
        eprintln!(
            "[pipeline][{:?}] stage={} err={}",
            severity,
            ctx.stage.as_str(),
            error
        );
    }

    fn on_alert(&self, ctx: &StageContext, severity: Severity, error: &PipelineError) {
        eprintln!(
            "[ALERT][pipeline][{:?}] stage={} err={}",
            severity,
            ctx.stage.as_str(),
            error
        );
    }
}

/// Appends stage events to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are
    /// ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{line}");
        }
    }
}

impl PipelineObserver for FileObserver {
    fn on_stage_success(&self, ctx: &StageContext, stats: StageStats) {
        self.append_line(&format!(
            "{} ok stage={} rows_in={} rows_out={} dropped={}",
            unix_ts(),
            ctx.stage.as_str(),
            stats.rows_in,
            stats.rows_out,
            stats.rows_dropped
        ));
    }

    fn on_stage_failure(&self, ctx: &StageContext, severity: Severity, error: &PipelineError) {
        self.append_line(&format!(
            "{} fail severity={:?} stage={} err={}",
            unix_ts(),
            severity,
            ctx.stage.as_str(),
            error
        ));
    }

    fn on_alert(&self, ctx: &StageContext, severity: Severity, error: &PipelineError) {
        self.append_line(&format!(
            "{} ALERT severity={:?} stage={} err={}",
            unix_ts(),
            severity,
            ctx.stage.as_str(),
            error
        ));
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
