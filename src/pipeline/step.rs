//! Linear step machine driving a run

use crate::stage::StageRole;

/// Steps of a run, in execution order.
///
/// Transitions are strictly linear: no branching and no retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStep {
    Plan,
    LoadAnalyze,
    Hypothesize,
    Validate,
    Recommend,
    Compile,
}

impl PipelineStep {
    pub const FIRST: PipelineStep = PipelineStep::Plan;

    pub fn next(self) -> Option<PipelineStep> {
        match self {
            Self::Plan => Some(Self::LoadAnalyze),
            Self::LoadAnalyze => Some(Self::Hypothesize),
            Self::Hypothesize => Some(Self::Validate),
            Self::Validate => Some(Self::Recommend),
            Self::Recommend => Some(Self::Compile),
            Self::Compile => None,
        }
    }

    /// Reasoning role run by this step; `Compile` runs none.
    pub fn role(self) -> Option<StageRole> {
        match self {
            Self::Plan => Some(StageRole::Planner),
            Self::LoadAnalyze => Some(StageRole::DataAnalyst),
            Self::Hypothesize => Some(StageRole::Insight),
            Self::Validate => Some(StageRole::Evaluator),
            Self::Recommend => Some(StageRole::Creative),
            Self::Compile => None,
        }
    }

    /// Context keys the step is allowed to see.
    pub fn context_keys(self) -> &'static [&'static str] {
        match self {
            Self::Plan => &["sample_mode", "sample_size", "thresholds"],
            Self::LoadAnalyze => &["dataset_path", "sample_mode", "sample_size", "analysis_requirements"],
            Self::Hypothesize => &["plan", "data_summary", "analysis"],
            Self::Validate => &["hypotheses", "data_summary", "analysis"],
            Self::Recommend => &["analysis", "data_summary"],
            Self::Compile => &[],
        }
    }

    /// Context key the step's stage payload is stored under.
    pub fn output_key(self) -> Option<&'static str> {
        match self {
            Self::Plan => Some("plan"),
            Self::LoadAnalyze => Some("findings"),
            Self::Hypothesize => Some("hypotheses"),
            Self::Validate => Some("evaluation"),
            Self::Recommend => Some("recommendations"),
            Self::Compile => None,
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            Self::Plan => "planning analysis",
            Self::LoadAnalyze => "loading and analyzing data",
            Self::Hypothesize => "generating hypotheses",
            Self::Validate => "validating hypotheses",
            Self::Recommend => "generating creative recommendations",
            Self::Compile => "compiling report",
        }
    }
}

impl std::fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.role() {
            Some(role) => f.write_str(role.key()),
            None => f.write_str("compile"),
        }
    }
}
