use thiserror::Error;

/// Convenience result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Error type returned by every pipeline stage.
///
/// One enum is shared across loading, cleaning, merging, reshaping,
/// aggregation, and export. Each stage validates its own preconditions and
/// fails fast rather than producing a partially-correct table; unmatched
/// join rows are *not* errors (they are tallied in
/// [`crate::processing::merge::JoinDiagnostics`]).
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing error from the underlying reader.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// A source file is structurally unusable (missing required columns,
    /// malformed header).
    #[error("load error for {table}: {message}")]
    Load { table: String, message: String },

    /// A cell could not be parsed into the required
    /// [`crate::types::DataType`].
    #[error("failed to parse value at row {row} column '{column}': {message} (raw='{raw}')")]
    Parse {
        row: usize,
        column: String,
        raw: String,
        message: String,
    },

    /// Column rename collision or an unexpected column type at decode.
    #[error("schema error: {message}")]
    Schema { message: String },

    /// A join cannot be performed at all (as opposed to individual rows
    /// failing to match, which is a diagnostic).
    #[error("join error: {message}")]
    Join { message: String },

    /// The pivot would produce zero rows.
    #[error("reshape error: {message}")]
    Reshape { message: String },

    /// Malformed input to the statistics stage.
    #[error("aggregation error: {message}")]
    Aggregation { message: String },

    /// Configuration file unreadable or invalid.
    #[error("config error: {message}")]
    Config { message: String },

    #[cfg(feature = "excel")]
    /// Workbook export error (feature-gated behind `excel`).
    #[error("workbook error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}
