//! ReasoningStage: template -> prompt -> generate -> extract, with fallback
//!
//! One type serves every role. A role's descriptor supplies the template key,
//! sampling parameters, instruction and fallback generator; the control flow
//! here never branches on the role itself.

use super::fallback::FallbackInput;
use super::prompt::{self, TemplateError, TemplateStore};
use super::role::RoleDescriptor;
use super::types::StageResult;
use crate::config::ActionabilityPolicy;
use crate::context::ExecutionContext;
use crate::extract::{ExtractionError, StructuredExtractor};
use crate::llm::{GenerationClient, GenerationError};
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

/// Why a generation attempt was replaced by a fallback.
///
/// Never escapes a stage; surfaced only as the `partial` result's message.
#[derive(Debug, Error)]
pub enum StageFailure {
    #[error("generation service unavailable")]
    Unavailable,

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("extracted record is empty")]
    EmptyRecord,
}

pub struct ReasoningStage {
    descriptor: RoleDescriptor,
    client: Arc<dyn GenerationClient>,
    templates: Arc<dyn TemplateStore>,
    extractor: StructuredExtractor,
    policy: ActionabilityPolicy,
}

impl ReasoningStage {
    pub fn new(
        descriptor: RoleDescriptor,
        client: Arc<dyn GenerationClient>,
        templates: Arc<dyn TemplateStore>,
    ) -> Self {
        Self {
            descriptor,
            client,
            templates,
            extractor: StructuredExtractor::new(),
            policy: ActionabilityPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ActionabilityPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_extractor(mut self, extractor: StructuredExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn descriptor(&self) -> &RoleDescriptor {
        &self.descriptor
    }

    /// Run the stage over `context`.
    ///
    /// Generation and extraction failures become a `partial` result carrying
    /// the role's fallback record. Only a template that cannot be loaded is
    /// returned as an error.
    pub async fn run(
        &self,
        task: &str,
        context: &ExecutionContext,
    ) -> Result<StageResult, TemplateError> {
        let template = self.templates.load(self.descriptor.role)?;

        let Some(fan_out) = self.descriptor.fan_out else {
            let result = match self.attempt(&template, task, context, None).await {
                Ok(payload) => StageResult::success(payload),
                Err(failure) => {
                    let fallback = self.fallback(task, context, None);
                    tracing::warn!(
                        stage = %self.descriptor.role,
                        error = %failure,
                        "generation failed, using fallback"
                    );
                    StageResult::partial(fallback, failure.to_string())
                }
            };
            return Ok(result);
        };

        let items = context.array_at(fan_out.path);
        if items.is_empty() {
            tracing::info!(stage = %self.descriptor.role, "no items to process");
            return Ok(StageResult::success((fan_out.empty)()));
        }

        let mut outputs = Vec::new();
        let mut failures = Vec::new();
        for (index, item) in items.iter().take(fan_out.limit).enumerate() {
            match self.attempt(&template, task, context, Some(item)).await {
                Ok(payload) => outputs.push(payload),
                Err(failure) => {
                    tracing::warn!(
                        stage = %self.descriptor.role,
                        item = index,
                        error = %failure,
                        "generation failed for item, using fallback"
                    );
                    failures.push(format!("item {index}: {failure}"));
                    outputs.push(self.fallback(task, context, Some(item)));
                }
            }
        }

        let mut payload = Map::new();
        payload.insert("count".to_string(), Value::from(outputs.len()));
        payload.insert(fan_out.collect_as.to_string(), Value::Array(outputs));
        let payload = Value::Object(payload);

        Ok(if failures.is_empty() {
            StageResult::success(payload)
        } else {
            StageResult::partial(payload, failures.join("; "))
        })
    }

    async fn attempt(
        &self,
        template: &str,
        task: &str,
        context: &ExecutionContext,
        item: Option<&Value>,
    ) -> Result<Value, StageFailure> {
        if !self.client.is_available().await {
            return Err(StageFailure::Unavailable);
        }

        let prompt = prompt::assemble(template, task, context, item, self.descriptor.instruction);
        tracing::debug!(
            stage = %self.descriptor.role,
            prompt_chars = prompt.len(),
            temperature = self.descriptor.sampling.temperature,
            "invoking generation service"
        );

        let raw = self.client.generate(&prompt, &self.descriptor.sampling).await?;
        let record = self.extractor.extract(&raw)?;

        match record.as_object() {
            Some(map) if map.is_empty() => Err(StageFailure::EmptyRecord),
            _ => Ok(record),
        }
    }

    fn fallback(&self, task: &str, context: &ExecutionContext, item: Option<&Value>) -> Value {
        (self.descriptor.fallback)(&FallbackInput {
            task,
            context,
            item,
            policy: &self.policy,
        })
    }
}
