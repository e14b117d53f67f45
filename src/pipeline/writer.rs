//! Persists a compiled report as insights, creatives, markdown and trace files

use super::report::Report;
use super::{PipelineError, PipelineResult};
use crate::config::{ActionabilityPolicy, OutputConfig};
use crate::stage::clamp_unit;
use serde_json::Value;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Evaluations shown in the markdown summary.
const REPORTED_EVALUATIONS: usize = 3;
/// Campaigns whose lead creative is shown in the markdown summary.
const REPORTED_CAMPAIGNS: usize = 2;

/// Paths of the files written for one report.
#[derive(Debug, Clone, PartialEq)]
pub struct WrittenArtifacts {
    pub insights: PathBuf,
    pub creatives: PathBuf,
    pub report: PathBuf,
    pub trace: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ReportWriter {
    output: OutputConfig,
    policy: ActionabilityPolicy,
}

impl ReportWriter {
    pub fn new(output: OutputConfig, policy: ActionabilityPolicy) -> Self {
        Self { output, policy }
    }

    /// Write every artifact or none of them.
    ///
    /// Contents are rendered up front and staged next to their targets; the
    /// targets are only replaced once every staged file is on disk. A failed
    /// write or rename removes whatever this call already put in place.
    pub fn write(&self, report: &Report) -> PipelineResult<WrittenArtifacts> {
        let artifacts = WrittenArtifacts {
            insights: self.output.insights_path.clone(),
            creatives: self.output.creatives_path.clone(),
            report: self.output.report_path.clone(),
            trace: self
                .output
                .logs_path
                .join(format!("{}.jsonl", report.execution_id)),
        };

        let contents = [
            (
                &artifacts.insights,
                serde_json::to_string_pretty(&report.insights)?,
            ),
            (
                &artifacts.creatives,
                serde_json::to_string_pretty(&report.creative_recommendations)?,
            ),
            (&artifacts.report, render_markdown(report, &self.policy)),
            (&artifacts.trace, report.execution_trace.to_jsonl()?),
        ];

        let mut staged = Vec::with_capacity(contents.len());
        for (target, body) in &contents {
            match stage_file(target, body) {
                Ok(staging) => staged.push((staging, target.as_path())),
                Err(err) => {
                    discard(staged.iter().map(|(staging, _)| staging.as_path()));
                    return Err(err);
                }
            }
        }

        for (i, (staging, target)) in staged.iter().enumerate() {
            if let Err(source) = std::fs::rename(staging, target) {
                discard(staged[..i].iter().map(|(_, target)| *target));
                discard(staged[i..].iter().map(|(staging, _)| staging.as_path()));
                return Err(PipelineError::Write {
                    path: target.to_path_buf(),
                    source,
                });
            }
        }

        tracing::info!(
            execution_id = %report.execution_id,
            report = %artifacts.report.display(),
            "report written"
        );
        Ok(artifacts)
    }
}

/// Sibling path a target is written to before being renamed into place.
fn staging_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    target.with_file_name(name)
}

fn stage_file(target: &Path, contents: &str) -> PipelineResult<PathBuf> {
    let io_err = |source| PipelineError::Write {
        path: target.to_path_buf(),
        source,
    };
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let staging = staging_path(target);
    std::fs::write(&staging, contents).map_err(io_err)?;
    Ok(staging)
}

fn discard<'a>(paths: impl Iterator<Item = &'a Path>) {
    for path in paths {
        if let Err(err) = std::fs::remove_file(path) {
            tracing::warn!(path = %path.display(), error = %err, "could not remove artifact");
        }
    }
}

fn text<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or("N/A")
}

/// Render the human-readable summary.
pub fn render_markdown(report: &Report, policy: &ActionabilityPolicy) -> String {
    let campaigns = report
        .creative_recommendations
        .as_array()
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    let mut md = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(md, "# Ad Performance Analysis Report\n");
    let _ = writeln!(md, "**Execution ID**: {}  ", report.execution_id);
    let _ = writeln!(md, "**Generated**: {}\n", report.timestamp.to_rfc3339());
    let _ = writeln!(md, "## Analysis Query\n\n{}\n", report.query);

    let _ = writeln!(md, "## Executive Summary\n");
    let _ = writeln!(md, "- Total Records Analyzed: {}", report.row_count());
    let _ = writeln!(md, "- Hypotheses Generated: {}", report.hypotheses().len());
    let _ = writeln!(md, "- Creative Recommendations: {}\n", campaigns.len());

    let _ = writeln!(md, "## Key Findings\n\n### Validated Hypotheses\n");
    let evaluations = report
        .evaluation
        .get("hypothesis_evaluations")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);
    for eval in evaluations.iter().take(REPORTED_EVALUATIONS) {
        let confidence = clamp_unit(
            eval.get("confidence_score")
                .and_then(Value::as_f64)
                .unwrap_or(0.0),
        );
        let _ = writeln!(md, "**{}**", text(eval, "hypothesis_title"));
        let _ = writeln!(md, "- Status: {}", text(eval, "validation_status"));
        let _ = writeln!(md, "- Confidence: {:.0}%", confidence * 100.0);
        let _ = writeln!(md, "- Action: {}\n", policy.classify(confidence).describe());
    }

    let _ = writeln!(md, "## Recommended Actions\n");
    if let Some(actions) = report.evaluation.get("recommended_actions").and_then(Value::as_array) {
        for action in actions.iter().filter_map(Value::as_str) {
            let _ = writeln!(md, "- {action}");
        }
    }

    let _ = writeln!(md, "\n## Creative Recommendations\n");
    let _ = writeln!(
        md,
        "Generated recommendations for {} low-CTR campaigns.\n",
        campaigns.len()
    );
    for (i, campaign) in campaigns.iter().take(REPORTED_CAMPAIGNS).enumerate() {
        let lead = campaign
            .get("creative_recommendations")
            .and_then(Value::as_array)
            .and_then(|recs| recs.first());
        if let Some(creative) = lead {
            let _ = writeln!(md, "### Campaign {}", i + 1);
            let _ = writeln!(md, "**{}**", text(creative, "headline"));
            let _ = writeln!(md, "- Angle: {}", text(creative, "creative_angle"));
            let _ = writeln!(md, "- Predicted Lift: {}\n", text(creative, "predicted_lift"));
        }
    }

    md
}
