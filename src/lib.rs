//! ad-analyst: multi-stage reasoning pipeline for advertising performance
//!
//! Runs a fixed sequence of reasoning stages over a tabular ad-performance
//! export. Each stage turns free-form generated text into a structured record,
//! and falls back to a deterministic record when generation or extraction
//! fails, so an unavailable generation service degrades output but never
//! halts a run.
//!
//! # Core Concepts
//!
//! - **Extractor**: ordered strategies recovering a JSON object from text
//! - **Stages**: one parameterized reasoning stage per role (planner, data
//!   analyst, insight, evaluator, creative)
//! - **Dataset engine**: CSV loading, summary, low-CTR filter, timeline,
//!   grouped performance
//! - **Orchestrator**: sequences the stages, narrows context per stage,
//!   records the trace and persists the report
//!
//! # Example
//!
//! ```
//! use ad_analyst::extract;
//!
//! let record = extract("```json\n{\"ok\": true}\n```").unwrap();
//! assert_eq!(record["ok"], true);
//! ```

pub mod config;
pub mod context;
pub mod dataset;
pub mod extract;
pub mod llm;
pub mod pipeline;
pub mod stage;

pub use config::{Actionability, ActionabilityPolicy, AppConfig, ConfigError};
pub use context::{ContextError, ExecutionContext};
pub use dataset::{
    AnalysisBundle, DatasetEngine, DatasetError, DatasetRecord, DatasetSummary, Dimension,
    LoadOptions, TimelinePoint,
};
pub use extract::{extract, ExtractionError, StructuredExtractor};
pub use llm::{GeminiClient, GeminiConfig, GenerationClient, GenerationError, MockClient, SamplingParams};
pub use pipeline::{
    ExecutionTrace, Orchestrator, PipelineError, PipelineStep, Report, RunOutcome, RunStatus,
    DEFAULT_QUERY,
};
pub use stage::{
    FileTemplateStore, Hypothesis, ReasoningStage, Recommendation, StageResult, StageRole,
    StageStatus, StaticTemplateStore, TemplateStore,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
