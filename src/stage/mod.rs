//! Reasoning stages
//!
//! A stage assembles a prompt from a role template and its narrowed context,
//! calls the generation service, and extracts a structured record from the
//! response. When generation or extraction fails the stage substitutes its
//! role's deterministic fallback and reports `partial`; it never raises for
//! those failures.

pub mod fallback;
mod prompt;
mod reasoning;
mod role;
mod types;

pub use fallback::FallbackInput;
pub use prompt::{
    assemble as assemble_prompt, builtin_template, FileTemplateStore, StaticTemplateStore,
    TemplateError, TemplateStore,
};
pub use reasoning::{ReasoningStage, StageFailure};
pub use role::{FanOut, RoleDescriptor, StageRole, CREATIVE_CAMPAIGN_LIMIT};
pub use types::{clamp_unit, Hypothesis, Recommendation, StageResult, StageStatus};
