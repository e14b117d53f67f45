//! Stage results and the domain records stages exchange

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome class of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Output came from the generation service
    Success,
    /// Output is a deterministic fallback record
    Partial,
    /// The stage produced nothing usable
    Error,
}

impl StageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Partial => "partial",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for StageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable result of one stage.
///
/// Constructors uphold the invariant that `partial` always carries a
/// payload and an error message, and `error` always carries a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    status: StageStatus,
    payload: Option<Value>,
    error: Option<String>,
}

impl StageResult {
    pub fn success(payload: Value) -> Self {
        Self {
            status: StageStatus::Success,
            payload: Some(payload),
            error: None,
        }
    }

    pub fn partial(fallback: Value, error: impl Into<String>) -> Self {
        Self {
            status: StageStatus::Partial,
            payload: Some(fallback),
            error: Some(non_empty(error.into())),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: StageStatus::Error,
            payload: None,
            error: Some(non_empty(message.into())),
        }
    }

    pub fn status(&self) -> StageStatus {
        self.status
    }

    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Field of the payload object, or `Value::Null`.
    pub fn field(&self, key: &str) -> &Value {
        self.payload
            .as_ref()
            .and_then(|p| p.get(key))
            .unwrap_or(&Value::Null)
    }

    pub fn is_success(&self) -> bool {
        self.status == StageStatus::Success
    }
}

fn non_empty(message: String) -> String {
    if message.trim().is_empty() {
        "unspecified failure".to_string()
    } else {
        message
    }
}

/// Candidate explanation for an observed performance pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hypothesis {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub driver: String,
    #[serde(default)]
    pub testable_prediction: String,
    #[serde(default)]
    pub supporting_evidence: Vec<String>,
    /// Clamped to [0, 1] by `list_from`
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub confidence_reasoning: String,
}

impl Hypothesis {
    /// Hypotheses under `payload.hypotheses`, skipping malformed entries.
    pub fn list_from(payload: &Value) -> Vec<Hypothesis> {
        payload
            .get("hypotheses")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| serde_json::from_value::<Hypothesis>(v.clone()).ok())
                    .map(|mut h| {
                        h.confidence = clamp_unit(h.confidence);
                        h
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Clamp to [0, 1]; NaN becomes 0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// A proposed creative message for a low-performing campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(default)]
    pub id: String,
    pub headline: String,
    #[serde(default)]
    pub creative_angle: String,
    #[serde(default)]
    pub value_prop: String,
    #[serde(default)]
    pub cta: String,
    #[serde(default, alias = "why_this_works")]
    pub rationale: String,
    #[serde(default)]
    pub predicted_lift: String,
}

impl Recommendation {
    /// Recommendations under `campaign_entry.creative_recommendations`.
    pub fn list_from(campaign_entry: &Value) -> Vec<Recommendation> {
        campaign_entry
            .get("creative_recommendations")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| serde_json::from_value::<Recommendation>(v.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }
}
