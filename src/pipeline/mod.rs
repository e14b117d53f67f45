//! Pipeline orchestration
//!
//! `Plan → Load&Analyze → Hypothesize → Validate → Recommend → Compile`,
//! strictly sequential. Each step sees only the context keys it needs; its
//! stage result is recorded in the execution trace and its payload appended
//! to the run context for later steps.

mod orchestrator;
mod report;
mod step;
mod trace;
mod writer;

pub use orchestrator::{Orchestrator, DEFAULT_QUERY};
pub use report::{Report, RunOutcome, RunStatus, StageEntry};
pub use step::PipelineStep;
pub use trace::{ExecutionTrace, TraceEntry};
pub use writer::{render_markdown, ReportWriter, WrittenArtifacts};

use crate::context::ContextError;
use crate::dataset::DatasetError;
use crate::stage::TemplateError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error("stage {0} produced no payload")]
    MissingPayload(String),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("pipeline ended before compiling a report")]
    Incomplete,
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;
