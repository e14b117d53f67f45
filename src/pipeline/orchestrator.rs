//! Orchestrator: sequences stages, threads context, compiles the report
//!
//! Stages run strictly in order. A `partial` stage result is not a failure:
//! its fallback payload flows on as if it were generated. Structural errors
//! (missing dataset, unreadable template) abort the run, and nothing is
//! persisted.

use super::report::{Report, RunOutcome, RunStatus, StageEntry};
use super::step::PipelineStep;
use super::trace::ExecutionTrace;
use super::writer::ReportWriter;
use super::{PipelineError, PipelineResult};
use crate::config::AppConfig;
use crate::context::ExecutionContext;
use crate::dataset::{AnalysisBundle, AnalysisKind, DatasetEngine, LoadOptions};
use crate::llm::GenerationClient;
use crate::stage::{ReasoningStage, RoleDescriptor, StageResult, StageRole, TemplateStore};
use chrono::Local;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;

/// Query used when none is supplied.
pub const DEFAULT_QUERY: &str =
    "Analyze why ROAS has declined over the past 30 days and recommend new creative strategies";

/// Per-run mutable state, discarded after `execute` returns.
struct RunState {
    execution_id: String,
    query: String,
    context: ExecutionContext,
    stages: Vec<StageEntry>,
    trace: ExecutionTrace,
}

impl RunState {
    fn record(&mut self, step: PipelineStep, result: StageResult) {
        self.trace
            .record(&self.execution_id, &step.to_string(), result.status());
        self.stages.push(StageEntry {
            stage: step.to_string(),
            result,
        });
    }

    fn stage_payload(&self, step: PipelineStep) -> Value {
        let name = step.to_string();
        self.stages
            .iter()
            .find(|e| e.stage == name)
            .and_then(|e| e.result.payload().cloned())
            .unwrap_or(Value::Null)
    }
}

pub struct Orchestrator {
    config: Arc<AppConfig>,
    planner: ReasoningStage,
    data_analyst: ReasoningStage,
    insight: ReasoningStage,
    evaluator: ReasoningStage,
    creative: ReasoningStage,
    writer: ReportWriter,
}

impl Orchestrator {
    pub fn new(
        config: Arc<AppConfig>,
        client: Arc<dyn GenerationClient>,
        templates: Arc<dyn TemplateStore>,
    ) -> Self {
        let policy = config.actionability_policy();
        let build = |role: StageRole| {
            let agent = match role {
                StageRole::Planner => &config.agents.planner,
                StageRole::DataAnalyst => &config.agents.data_agent,
                StageRole::Insight => &config.agents.insight_agent,
                StageRole::Evaluator => &config.agents.evaluator,
                StageRole::Creative => &config.agents.creative_generator,
            };
            ReasoningStage::new(
                RoleDescriptor::for_role(role, agent.sampling()),
                client.clone(),
                templates.clone(),
            )
            .with_policy(policy)
        };

        Self {
            planner: build(StageRole::Planner),
            data_analyst: build(StageRole::DataAnalyst),
            insight: build(StageRole::Insight),
            evaluator: build(StageRole::Evaluator),
            creative: build(StageRole::Creative),
            writer: ReportWriter::new(config.output.clone(), policy),
            config,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    fn stage(&self, role: StageRole) -> &ReasoningStage {
        match role {
            StageRole::Planner => &self.planner,
            StageRole::DataAnalyst => &self.data_analyst,
            StageRole::Insight => &self.insight,
            StageRole::Evaluator => &self.evaluator,
            StageRole::Creative => &self.creative,
        }
    }

    /// Run every step for `query` and persist the report.
    ///
    /// Never returns `Err`: a fatal error becomes `RunOutcome::Failed`.
    pub async fn execute(&self, query: &str) -> RunOutcome {
        let execution_id = Local::now().format("%Y%m%d_%H%M%S").to_string();
        tracing::info!(%execution_id, query, "execution started");

        let mut run = RunState {
            execution_id: execution_id.clone(),
            query: query.to_string(),
            context: self.initial_context(),
            stages: Vec::new(),
            trace: ExecutionTrace::new(),
        };

        match self.drive(&mut run).await {
            Ok(report) => {
                tracing::info!(%execution_id, "execution complete");
                RunOutcome::Completed(Box::new(report))
            }
            Err(e) => {
                tracing::error!(%execution_id, error = %e, "execution failed");
                RunOutcome::Failed {
                    execution_id,
                    error: e.to_string(),
                }
            }
        }
    }

    fn initial_context(&self) -> ExecutionContext {
        let data = &self.config.data;
        let requirements: Vec<&str> = AnalysisKind::ALL.iter().map(|k| k.key()).collect();
        let thresholds = serde_json::to_value(&self.config.thresholds).unwrap_or(Value::Null);
        ExecutionContext::new()
            .with("dataset_path", data.dataset_path.display().to_string())
            .with("sample_mode", data.sample_mode)
            .with("sample_size", data.sample_size)
            .with("thresholds", thresholds)
            .with("analysis_requirements", requirements)
    }

    async fn drive(&self, run: &mut RunState) -> PipelineResult<Report> {
        let mut step = Some(PipelineStep::FIRST);
        while let Some(current) = step {
            tracing::info!(execution_id = %run.execution_id, step = %current, "{}", current.describe());
            match current {
                PipelineStep::LoadAnalyze => self.load_and_analyze(run).await?,
                PipelineStep::Compile => {
                    let report = compile(run);
                    self.writer.write(&report)?;
                    return Ok(report);
                }
                _ => self.reason(current, run).await?,
            }
            step = current.next();
        }
        Err(PipelineError::Incomplete)
    }

    /// Run a reasoning step over its narrowed context and fold its payload back.
    async fn reason(&self, step: PipelineStep, run: &mut RunState) -> PipelineResult<()> {
        let (Some(role), Some(key)) = (step.role(), step.output_key()) else {
            return Ok(());
        };
        let context = run.context.select(step.context_keys());
        let result = self.stage(role).run(&run.query, &context).await?;
        let payload = result
            .payload()
            .cloned()
            .ok_or_else(|| PipelineError::MissingPayload(step.to_string()))?;
        run.context.insert(key, payload)?;
        run.record(step, result);
        Ok(())
    }

    async fn load_and_analyze(&self, run: &mut RunState) -> PipelineResult<()> {
        let step = PipelineStep::LoadAnalyze;
        let inputs = run.context.select(step.context_keys());

        let path = PathBuf::from(inputs.str_at("dataset_path").unwrap_or_default());
        let sampled = inputs.get("sample_mode").and_then(Value::as_bool).unwrap_or(false);
        let options = match inputs.get("sample_size").and_then(Value::as_u64) {
            Some(n) if sampled => LoadOptions::sampled(n as usize),
            _ => LoadOptions::full(),
        };
        let requested: Vec<AnalysisKind> = inputs
            .array_at("analysis_requirements")
            .iter()
            .filter_map(Value::as_str)
            .filter_map(AnalysisKind::parse)
            .collect();

        let engine = DatasetEngine::load(&path, options)?;
        let summary = serde_json::to_value(engine.summarize())?;
        let analysis = serde_json::to_value(AnalysisBundle::compute(
            &engine,
            &requested,
            self.config.thresholds.low_ctr,
        ))?;
        tracing::info!(
            execution_id = %run.execution_id,
            records = engine.len(),
            "dataset analysed"
        );

        run.context.insert("data_summary", summary.clone())?;
        run.context.insert("analysis", analysis.clone())?;

        let analyst_context = run.context.select(&["data_summary", "analysis"]);
        let findings = self.data_analyst.run(&run.query, &analyst_context).await?;
        let findings_payload = findings
            .payload()
            .cloned()
            .ok_or_else(|| PipelineError::MissingPayload(step.to_string()))?;
        if let Some(key) = step.output_key() {
            run.context.insert(key, findings_payload.clone())?;
        }

        let payload = json!({
            "data_summary": summary,
            "analysis": analysis,
            "structured_findings": findings_payload,
            "record_count": engine.len(),
        });
        let result = match findings.error_message() {
            Some(error) if !findings.is_success() => StageResult::partial(payload, error),
            _ => StageResult::success(payload),
        };
        run.record(step, result);
        Ok(())
    }
}

/// Pure assembly of the report from the recorded stages.
fn compile(run: &RunState) -> Report {
    let data = run.stage_payload(PipelineStep::LoadAnalyze);
    let creative = run.stage_payload(PipelineStep::Recommend);

    Report {
        execution_id: run.execution_id.clone(),
        timestamp: Local::now(),
        query: run.query.clone(),
        status: RunStatus::Success,
        plan: run.stage_payload(PipelineStep::Plan),
        data_summary: data.get("data_summary").cloned().unwrap_or(Value::Null),
        analysis: data.get("analysis").cloned().unwrap_or(Value::Null),
        findings: data.get("structured_findings").cloned().unwrap_or(Value::Null),
        insights: run.stage_payload(PipelineStep::Hypothesize),
        evaluation: run.stage_payload(PipelineStep::Validate),
        creative_recommendations: creative
            .get("recommendations")
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new())),
        stages: run.stages.clone(),
        execution_trace: run.trace.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockClient;
    use crate::stage::StaticTemplateStore;

    fn config_with_dataset(dir: &tempfile::TempDir, dataset: PathBuf) -> AppConfig {
        let mut config = AppConfig::default();
        config.data.dataset_path = dataset;
        config.output.insights_path = dir.path().join("out/insights.json");
        config.output.creatives_path = dir.path().join("out/creatives.json");
        config.output.report_path = dir.path().join("out/report.md");
        config.output.logs_path = dir.path().join("logs");
        config
    }

    #[test]
    fn initial_context_holds_run_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with_dataset(&dir, PathBuf::from("ads.csv"));
        let orchestrator = Orchestrator::new(
            Arc::new(config),
            Arc::new(MockClient::failing()),
            Arc::new(StaticTemplateStore::builtin()),
        );
        let ctx = orchestrator.initial_context();
        assert_eq!(ctx.str_at("dataset_path"), Some("ads.csv"));
        assert_eq!(ctx.array_at("analysis_requirements").len(), 4);
        assert_eq!(ctx.get_path("thresholds.low_ctr"), Some(&json!(0.012)));
    }

    #[tokio::test]
    async fn missing_dataset_fails_after_planning() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with_dataset(&dir, dir.path().join("missing.csv"));
        let client = Arc::new(MockClient::failing());
        let orchestrator = Orchestrator::new(
            Arc::new(config),
            client.clone(),
            Arc::new(StaticTemplateStore::builtin()),
        );

        let outcome = orchestrator.execute("q").await;
        assert_eq!(outcome.status(), RunStatus::Error);
        assert!(outcome.error().unwrap().contains("missing.csv"));
        // Only the planner ran
        assert_eq!(client.call_count(), 1);
        assert!(!dir.path().join("out").exists());
    }

    #[tokio::test]
    async fn unreadable_template_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with_dataset(&dir, dir.path().join("ads.csv"));
        let orchestrator = Orchestrator::new(
            Arc::new(config),
            Arc::new(MockClient::failing()),
            Arc::new(StaticTemplateStore::empty()),
        );
        let outcome = orchestrator.execute("q").await;
        assert!(!outcome.is_success());
        assert!(outcome.error().unwrap().contains("planner"));
    }
}
