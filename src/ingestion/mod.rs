//! Loading of the three CSV sources into validated in-memory tables.
//!
//! Most callers should use [`load_tables`], which reads all three sources
//! and validates each against its fixed required-column set. Per-file
//! loading is available via [`csv::read_table_from_path`].

pub mod csv;
pub mod observability;

use std::path::{Path, PathBuf};

use crate::error::PipelineResult;
use crate::model::columns;
use crate::types::{DataType, Field, Table};

pub use observability::{
    CompositeObserver, FileObserver, PipelineObserver, Severity, Stage, StageContext, StageStats,
    StdErrObserver,
};

/// Which of the three course-platform exports a file is.
///
/// The kind fixes the required column set (validated before a table is
/// returned) and the expected cell types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    /// `ACTIVITY_LOG.csv`: one row per logged interaction.
    Activity,
    /// `USER_LOG.csv`: one row per user-session timestamp.
    UserLog,
    /// `COMPONENT_CODES.csv`: component reference table.
    ComponentCodes,
}

impl TableKind {
    /// Conventional source file name, used in error messages.
    pub fn source_name(&self) -> &'static str {
        match self {
            Self::Activity => "ACTIVITY_LOG",
            Self::UserLog => "USER_LOG",
            Self::ComponentCodes => "COMPONENT_CODES",
        }
    }

    /// Required columns (source header names) and their expected types.
    pub fn required_fields(&self) -> Vec<Field> {
        match self {
            Self::Activity => vec![
                Field::new(columns::SOURCE_USER, DataType::Int64),
                Field::new(columns::COMPONENT, DataType::Utf8),
                Field::new(columns::ACTION, DataType::Utf8),
                Field::new(columns::TARGET, DataType::Utf8),
                Field::new(columns::DATE, DataType::Date),
            ],
            Self::UserLog => vec![
                Field::new(columns::SOURCE_USER, DataType::Int64),
                Field::new(columns::DATE, DataType::Date),
                Field::new(columns::TIME, DataType::Utf8),
            ],
            Self::ComponentCodes => vec![
                Field::new(columns::COMPONENT, DataType::Utf8),
                Field::new(columns::CODE, DataType::Utf8),
            ],
        }
    }

    /// Columns ingested when present but not required.
    pub fn optional_fields(&self) -> Vec<Field> {
        match self {
            Self::ComponentCodes => vec![Field::new(columns::CATEGORY, DataType::Utf8)],
            _ => Vec::new(),
        }
    }
}

/// Paths of the three CSV sources for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePaths {
    pub activity: PathBuf,
    pub user_log: PathBuf,
    pub component_codes: PathBuf,
}

impl SourcePaths {
    /// Bundle the three source paths.
    pub fn new(
        activity: impl AsRef<Path>,
        user_log: impl AsRef<Path>,
        component_codes: impl AsRef<Path>,
    ) -> Self {
        Self {
            activity: activity.as_ref().to_path_buf(),
            user_log: user_log.as_ref().to_path_buf(),
            component_codes: component_codes.as_ref().to_path_buf(),
        }
    }
}

/// The three loaded tables, prior to cleaning. Column names are still the
/// source spellings here; the cleaner applies the configured renames.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTables {
    pub activity: Table,
    pub user_log: Table,
    pub component_codes: Table,
}

impl RawTables {
    /// Total row count across the three tables.
    pub fn total_rows(&self) -> usize {
        self.activity.row_count() + self.user_log.row_count() + self.component_codes.row_count()
    }
}

/// Load all three sources, validating each against its required columns.
///
/// Fails on the first unreadable or structurally invalid file. Source files
/// are never mutated.
pub fn load_tables(paths: &SourcePaths) -> PipelineResult<RawTables> {
    Ok(RawTables {
        activity: csv::read_table_from_path(&paths.activity, TableKind::Activity)?,
        user_log: csv::read_table_from_path(&paths.user_log, TableKind::UserLog)?,
        component_codes: csv::read_table_from_path(&paths.component_codes, TableKind::ComponentCodes)?,
    })
}
