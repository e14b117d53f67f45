//! Compiled report and run outcome

use super::trace::ExecutionTrace;
use crate::stage::{Hypothesis, Recommendation, StageResult};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    Error,
}

/// A stage result keyed by stage name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageEntry {
    pub stage: String,
    #[serde(flatten)]
    pub result: StageResult,
}

/// Terminal aggregate of a successful run. Immutable once compiled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub execution_id: String,
    pub timestamp: DateTime<Local>,
    pub query: String,
    pub status: RunStatus,
    pub plan: Value,
    pub data_summary: Value,
    pub analysis: Value,
    pub findings: Value,
    pub insights: Value,
    pub evaluation: Value,
    pub creative_recommendations: Value,
    pub stages: Vec<StageEntry>,
    pub execution_trace: ExecutionTrace,
}

impl Report {
    pub fn stage(&self, name: &str) -> Option<&StageResult> {
        self.stages
            .iter()
            .find(|e| e.stage == name)
            .map(|e| &e.result)
    }

    pub fn hypotheses(&self) -> Vec<Hypothesis> {
        Hypothesis::list_from(&self.insights)
    }

    /// Recommendations per campaign, in campaign order.
    pub fn recommendations(&self) -> Vec<Vec<Recommendation>> {
        self.creative_recommendations
            .as_array()
            .map(|campaigns| campaigns.iter().map(Recommendation::list_from).collect())
            .unwrap_or_default()
    }

    pub fn row_count(&self) -> u64 {
        self.data_summary
            .get("row_count")
            .and_then(Value::as_u64)
            .unwrap_or(0)
    }
}

/// Result of `Orchestrator::execute`.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed(Box<Report>),
    Failed { execution_id: String, error: String },
}

impl RunOutcome {
    pub fn status(&self) -> RunStatus {
        match self {
            Self::Completed(report) => report.status,
            Self::Failed { .. } => RunStatus::Error,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status() == RunStatus::Success
    }

    pub fn execution_id(&self) -> &str {
        match self {
            Self::Completed(report) => &report.execution_id,
            Self::Failed { execution_id, .. } => execution_id,
        }
    }

    pub fn report(&self) -> Option<&Report> {
        match self {
            Self::Completed(report) => Some(report.as_ref()),
            Self::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Completed(_) => None,
            Self::Failed { error, .. } => Some(error),
        }
    }

    /// `{status: error, error, execution_id}` for a failed run, the report otherwise.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Completed(report) => serde_json::to_value(report).unwrap_or(Value::Null),
            Self::Failed { execution_id, error } => json!({
                "status": RunStatus::Error,
                "error": error,
                "execution_id": execution_id,
            }),
        }
    }
}
