//! Reasoning roles and their descriptors
//!
//! Every role shares one control flow (see `ReasoningStage`). What differs is
//! captured here: the template key, sampling parameters, output instruction,
//! the fallback generator and, for the creative role, a bounded fan-out over
//! an input list.

use super::fallback::{self, FallbackInput};
use crate::llm::SamplingParams;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Maximum number of low-CTR campaigns the creative role works on.
pub const CREATIVE_CAMPAIGN_LIMIT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageRole {
    Planner,
    DataAnalyst,
    Insight,
    Evaluator,
    Creative,
}

impl StageRole {
    pub const ALL: [StageRole; 5] = [
        Self::Planner,
        Self::DataAnalyst,
        Self::Insight,
        Self::Evaluator,
        Self::Creative,
    ];

    /// Key used for templates (`<key>.md`) and the `agents.<key>` config section.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Planner => "planner",
            Self::DataAnalyst => "data_agent",
            Self::Insight => "insight_agent",
            Self::Evaluator => "evaluator",
            Self::Creative => "creative_generator",
        }
    }
}

impl std::fmt::Display for StageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Run the role once per item of a context list instead of once overall.
#[derive(Debug, Clone, Copy)]
pub struct FanOut {
    /// Dotted context path of the input list
    pub path: &'static str,
    /// Items beyond this many are ignored
    pub limit: usize,
    /// Key the per-item outputs are collected under
    pub collect_as: &'static str,
    /// Payload returned when the input list is empty
    pub empty: fn() -> Value,
}

/// Everything role-specific about a reasoning stage.
#[derive(Clone)]
pub struct RoleDescriptor {
    pub role: StageRole,
    pub sampling: SamplingParams,
    /// Task-specific instruction appended after the context
    pub instruction: &'static str,
    pub fallback: fn(&FallbackInput<'_>) -> Value,
    pub fan_out: Option<FanOut>,
}

impl std::fmt::Debug for RoleDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleDescriptor")
            .field("role", &self.role)
            .field("sampling", &self.sampling)
            .field("fan_out", &self.fan_out)
            .finish_non_exhaustive()
    }
}

impl RoleDescriptor {
    pub fn for_role(role: StageRole, sampling: SamplingParams) -> Self {
        let (instruction, fallback, fan_out): (&'static str, fn(&FallbackInput<'_>) -> Value, Option<FanOut>) =
            match role {
                StageRole::Planner => (PLANNER_INSTRUCTION, fallback::plan, None),
                StageRole::DataAnalyst => (DATA_INSTRUCTION, fallback::data_findings, None),
                StageRole::Insight => (INSIGHT_INSTRUCTION, fallback::hypotheses, None),
                StageRole::Evaluator => (EVALUATOR_INSTRUCTION, fallback::evaluation, None),
                StageRole::Creative => (
                    CREATIVE_INSTRUCTION,
                    fallback::creative,
                    Some(FanOut {
                        path: "analysis.low_ctr_campaigns",
                        limit: CREATIVE_CAMPAIGN_LIMIT,
                        collect_as: "recommendations",
                        empty: no_low_performers,
                    }),
                ),
            };

        Self {
            role,
            sampling,
            instruction,
            fallback,
            fan_out,
        }
    }
}

fn no_low_performers() -> Value {
    json!({
        "recommendations": [],
        "count": 0,
        "message": "No low-CTR campaigns found for optimization",
    })
}

const PLANNER_INSTRUCTION: &str = "\
Decompose the query into a structured analysis plan. Identify the core question \
(ROAS drop, CTR optimization, creative assessment), break it into 3-4 subtasks \
with an owner for each, list data requirements, the validation approach and \
success criteria. Return a JSON object with keys: query, analysis_type, subtasks \
[{id, title, description, data_requirements, owner_agent}], key_metrics, \
success_criteria, reasoning.";

const DATA_INSTRUCTION: &str = "\
Summarise the dataset and analysis above. Return a JSON object with keys: \
summary, key_segments, trend_observations (list of strings), quality_notes, \
reasoning.";

const INSIGHT_INSTRUCTION: &str = "\
Generate 3-5 data-grounded hypotheses explaining the observed patterns. Tie each \
to a marketing driver (audience fatigue, creative decay, targeting), cite \
evidence from the data, state what would validate or disprove it and rate \
confidence between 0.0 and 1.0. Return a JSON object with keys: query_summary, \
hypotheses [{id, title, description, driver, testable_prediction, \
supporting_evidence, confidence, confidence_reasoning}], priority_ranking, \
reasoning.";

const EVALUATOR_INSTRUCTION: &str = "\
Validate each hypothesis against the data. List supporting and contradicting \
metrics, assign a confidence score between 0.0 and 1.0 and a validation status \
(CONFIRMED, PARTIALLY_CONFIRMED, REJECTED, REQUIRES_MORE_DATA). Treat deltas under \
5% as noise. Return a JSON object with keys: evaluation_summary, \
hypothesis_evaluations [{hypothesis_id, hypothesis_title, validation_approach, \
supporting_metrics, contradicting_metrics, confidence_score, \
confidence_reasoning, validation_status, actionability}], \
top_validated_insights, recommended_actions, evaluation_methodology.";

const CREATIVE_INSTRUCTION: &str = "\
Propose 3-5 new creative messages for the campaign under focus. Reuse patterns \
from high-performing creatives, address the likely cause of its low CTR and give \
each a value proposition, call to action and estimated CTR lift. Return a JSON \
object with keys: low_performer_analysis, creative_recommendations [{id, \
headline, creative_angle, value_prop, cta, why_this_works, predicted_lift}], \
implementation_priority.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_match_config_sections() {
        let keys: Vec<_> = StageRole::ALL.iter().map(|r| r.key()).collect();
        assert_eq!(
            keys,
            vec!["planner", "data_agent", "insight_agent", "evaluator", "creative_generator"]
        );
    }

    #[test]
    fn only_creative_fans_out() {
        for role in StageRole::ALL {
            let d = RoleDescriptor::for_role(role, SamplingParams::default());
            assert_eq!(d.fan_out.is_some(), role == StageRole::Creative);
        }
        let creative = RoleDescriptor::for_role(StageRole::Creative, SamplingParams::default());
        assert_eq!(creative.fan_out.unwrap().limit, 3);
    }
}
