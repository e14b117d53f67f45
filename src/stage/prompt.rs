//! Instruction templates and prompt assembly

use super::role::StageRole;
use crate::context::ExecutionContext;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("no template for role {0}")]
    NotFound(StageRole),

    #[error("failed to read template {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Source of role instruction templates, addressed by role.
pub trait TemplateStore: Send + Sync {
    fn load(&self, role: StageRole) -> Result<String, TemplateError>;
}

/// Reads `<dir>/<role key>.md`.
///
/// A missing file falls back to the built-in template for the role; any other
/// read failure is returned.
#[derive(Debug, Clone)]
pub struct FileTemplateStore {
    dir: PathBuf,
}

impl FileTemplateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, role: StageRole) -> PathBuf {
        self.dir.join(format!("{}.md", role.key()))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl TemplateStore for FileTemplateStore {
    fn load(&self, role: StageRole) -> Result<String, TemplateError> {
        let path = self.path_for(role);
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(role = %role, path = %path.display(), "template missing, using built-in");
                Ok(builtin_template(role).to_string())
            }
            Err(source) => Err(TemplateError::Io { path, source }),
        }
    }
}

/// In-memory templates.
#[derive(Debug, Clone, Default)]
pub struct StaticTemplateStore {
    templates: HashMap<StageRole, String>,
}

impl StaticTemplateStore {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in template for every role.
    pub fn builtin() -> Self {
        StageRole::ALL
            .iter()
            .fold(Self::empty(), |store, role| store.with(*role, builtin_template(*role)))
    }

    pub fn with(mut self, role: StageRole, template: impl Into<String>) -> Self {
        self.templates.insert(role, template.into());
        self
    }
}

impl TemplateStore for StaticTemplateStore {
    fn load(&self, role: StageRole) -> Result<String, TemplateError> {
        self.templates
            .get(&role)
            .cloned()
            .ok_or(TemplateError::NotFound(role))
    }
}

pub fn builtin_template(role: StageRole) -> &'static str {
    match role {
        StageRole::Planner => {
            "You are the planning agent of a Facebook Ads performance analysis system. \
             Turn the user's question into an ordered analysis plan."
        }
        StageRole::DataAnalyst => {
            "You are the data agent. Summarise an advertising dataset and the \
             aggregate analysis computed from it."
        }
        StageRole::Insight => {
            "You are the insight agent. Explain observed performance patterns with \
             testable, data-grounded hypotheses."
        }
        StageRole::Evaluator => {
            "You are the evaluator. Validate hypotheses quantitatively and assign \
             calibrated confidence scores."
        }
        StageRole::Creative => {
            "You are the creative strategist. Write new ad messages for campaigns \
             with low click-through rate."
        }
    }
}

const JSON_ONLY: &str =
    "Respond with a single JSON object only. Do not include commentary outside the JSON.";

/// Assemble the prompt sent to the generation service.
///
/// Sections, in order: template, task, context JSON, focus item (fan-out
/// roles only), instruction, output guidance.
pub fn assemble(
    template: &str,
    task: &str,
    context: &ExecutionContext,
    item: Option<&Value>,
    instruction: &str,
) -> String {
    let mut prompt = String::with_capacity(template.len() + 1024);
    prompt.push_str(template.trim_end());
    prompt.push_str("\n\n## Task\n\n");
    prompt.push_str(task);
    prompt.push_str("\n\n## Context\n\n");
    prompt.push_str(&context.to_pretty_json());
    if let Some(item) = item {
        prompt.push_str("\n\n## Focus\n\n");
        prompt.push_str(&serde_json::to_string_pretty(item).unwrap_or_else(|_| "{}".to_string()));
    }
    prompt.push_str("\n\n## Instruction\n\n");
    prompt.push_str(instruction);
    prompt.push_str("\n\n");
    prompt.push_str(JSON_ONLY);
    prompt
}
