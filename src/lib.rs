//! `course-engagement` is a small library for turning the three CSV exports
//! of an online course platform (activity events, user-session timestamps,
//! component reference codes) into a normalized, joined, reshaped dataset
//! with engagement statistics.
//!
//! The primary entrypoint is [`pipeline::Pipeline`], which exposes one
//! operation per stage. A driving interface (typically a GUI) sequences the
//! stages and displays each returned table; every stage consumes the prior
//! stage's output and returns a new immutable snapshot or fails with a typed
//! [`PipelineError`].
//!
//! ## Stages
//!
//! - **load**: three CSVs into validated in-memory [`types::Table`]s
//!   (required columns per source, typed cells)
//! - **clean**: column renames per the configured mapping, removal of
//!   excluded-component rows, decode into typed records
//! - **merge**: inner joins to user-session context and the component
//!   table, with drop tallies in
//!   [`processing::merge::JoinDiagnostics`]
//! - **reshape**: pivot to one row per `(user, time bucket)`, one column
//!   per component, zero-filled counts
//! - **aggregate**: per-user / per-component / per-bucket totals and
//!   descriptive stats
//! - **export** (cargo feature `excel`, on by default): one workbook with a
//!   sheet per stage output
//!
//! ## Quick example: run the whole pipeline
//!
//! ```no_run
//! use course_engagement::ingestion::SourcePaths;
//! use course_engagement::pipeline::Pipeline;
//!
//! # fn main() -> Result<(), course_engagement::PipelineError> {
//! let paths = SourcePaths::new("ACTIVITY_LOG.csv", "USER_LOG.csv", "COMPONENT_CODES.csv");
//! let pipeline = Pipeline::default();
//! let run = pipeline.run(&paths)?;
//! println!(
//!     "merged {} records ({} unmatched users, {} unmatched components)",
//!     run.merged.records.len(),
//!     run.merged.diagnostics.unmatched_user,
//!     run.merged.diagnostics.unmatched_component,
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Stage-by-stage driving (what a GUI does)
//!
//! ```no_run
//! use course_engagement::ingestion::SourcePaths;
//! use course_engagement::pipeline::Pipeline;
//!
//! # fn main() -> Result<(), course_engagement::PipelineError> {
//! let pipeline = Pipeline::default();
//! let paths = SourcePaths::new("ACTIVITY_LOG.csv", "USER_LOG.csv", "COMPONENT_CODES.csv");
//!
//! let raw = pipeline.load(&paths)?;
//! let cleaned = pipeline.clean(&raw)?;
//! let merged = pipeline.merge(&cleaned)?;
//! let reshaped = pipeline.reshape(&merged, &cleaned)?;
//! let summary = pipeline.aggregate(&reshaped)?;
//! println!("total interactions: {}", summary.total_interactions);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`pipeline`]: stage-sequencing facade with observer reporting
//! - [`ingestion`]: CSV loading and the stage-observer types
//! - [`processing`]: clean / merge / reshape / aggregate transformations
//! - [`model`]: typed domain records and the pivot table
//! - [`types`]: generic schema + table substrate
//! - [`config`]: column renames, excluded components, bucket granularity
//! - [`error`]: the crate-wide error type

pub mod config;
pub mod error;
#[cfg(feature = "excel")]
pub mod export;
pub mod ingestion;
pub mod model;
pub mod pipeline;
pub mod processing;
pub mod types;

pub use error::{PipelineError, PipelineResult};
pub use pipeline::{Pipeline, PipelineOptions, PipelineRun};
