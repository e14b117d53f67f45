//! Deterministic fallback records, one generator per role
//!
//! Substituted when generation or extraction fails. Each is a pure function
//! of the task, the stage's narrowed context and (for fan-out roles) the
//! current item; none touch the generation service.

use crate::config::ActionabilityPolicy;
use crate::context::ExecutionContext;
use crate::stage::clamp_unit;
use serde_json::{json, Value};

/// Inputs available to a fallback generator.
pub struct FallbackInput<'a> {
    pub task: &'a str,
    pub context: &'a ExecutionContext,
    /// Current fan-out item, if the role iterates over a list
    pub item: Option<&'a Value>,
    pub policy: &'a ActionabilityPolicy,
}

/// Number of hypotheses the evaluator fallback covers.
const EVALUATED_HYPOTHESES: usize = 3;

pub fn plan(input: &FallbackInput<'_>) -> Value {
    json!({
        "query": input.task,
        "analysis_type": "holistic",
        "subtasks": [
            {
                "id": "task_1",
                "title": "Load and summarize dataset",
                "description": "Aggregate performance metrics by campaign, adset, and creative type",
                "data_requirements": ["campaign_performance", "creative_performance", "roas_timeline"],
                "owner_agent": "data_agent"
            },
            {
                "id": "task_2",
                "title": "Generate performance hypotheses",
                "description": "Create 3-5 testable hypotheses explaining observed patterns",
                "data_requirements": ["roas_timeline", "creative_performance"],
                "owner_agent": "insight_agent"
            },
            {
                "id": "task_3",
                "title": "Validate hypotheses quantitatively",
                "description": "Test hypotheses against segment metrics and assign confidence scores",
                "data_requirements": ["campaign_performance", "creative_performance"],
                "owner_agent": "evaluator"
            },
            {
                "id": "task_4",
                "title": "Generate creative recommendations",
                "description": "Create new messaging for low-CTR campaigns based on winning patterns",
                "data_requirements": ["low_ctr_campaigns", "creative_performance"],
                "owner_agent": "creative_generator"
            }
        ],
        "key_metrics": ["roas", "ctr", "spend", "revenue", "impressions", "clicks"],
        "success_criteria": [
            "Load and summarize complete dataset",
            "Generate at least 3 data-grounded hypotheses",
            format!(
                "Validate hypotheses with confidence >= {}",
                input.policy.actionable_confidence
            ),
            "Generate 3-5 creative recommendations per low-CTR campaign"
        ],
        "reasoning": "Template plan covering the standard diagnosis steps; plan generation failed"
    })
}

pub fn data_findings(input: &FallbackInput<'_>) -> Value {
    let summary = input.context.get("data_summary").cloned().unwrap_or(Value::Null);
    let analysis = input.context.get("analysis").cloned().unwrap_or(Value::Null);

    let mut observations = vec!["Data loaded successfully".to_string()];
    if let Some(rows) = summary.get("row_count").and_then(Value::as_u64) {
        observations.push(format!("{rows} records analysed"));
    }
    if let Some(low) = analysis.get("low_ctr_count").and_then(Value::as_u64) {
        observations.push(format!("{low} records fall below the low-CTR threshold"));
    }

    json!({
        "summary": summary,
        "key_segments": analysis,
        "trend_observations": observations,
        "reasoning": "Basic data analysis completed; findings generation failed"
    })
}

pub fn hypotheses(input: &FallbackInput<'_>) -> Value {
    json!({
        "query_summary": input.task,
        "hypotheses": [
            {
                "id": "h1",
                "title": "Audience Fatigue",
                "description": "Repeated exposure to the same creative leads to CTR and ROAS decline over time",
                "driver": "Audience Fatigue",
                "testable_prediction": "CTR should decrease over time within the same audience-creative pairs; ROAS should drop after the first 7-14 days",
                "supporting_evidence": [
                    "High-performing creatives often show declining CTR patterns",
                    "Multiple campaigns are available for trend analysis"
                ],
                "confidence": 0.75,
                "confidence_reasoning": "Audience fatigue is well documented in paid social and the data spans multiple periods"
            },
            {
                "id": "h2",
                "title": "Creative Type Performance Variation",
                "description": "Different creative types (Image, Video, UGC) perform differently due to attention and engagement patterns",
                "driver": "Creative Decay / Format Effectiveness",
                "testable_prediction": "Video and UGC should outperform static images in CTR but decay faster",
                "supporting_evidence": [
                    "Dataset includes multiple creative types",
                    "Video typically performs better initially"
                ],
                "confidence": 0.70,
                "confidence_reasoning": "Creative type segmentation in the data allows direct validation"
            },
            {
                "id": "h3",
                "title": "Audience Targeting Mismatch",
                "description": "Broad audiences underperform Lookalike and Interest audiences due to lower relevance",
                "driver": "Audience Targeting Quality",
                "testable_prediction": "Lookalike and interest-based audiences should show higher CTR and ROAS than Broad audiences",
                "supporting_evidence": [
                    "Data includes audience type segmentation",
                    "More targeted audiences usually convert better"
                ],
                "confidence": 0.72,
                "confidence_reasoning": "Audience type is directly measurable"
            },
            {
                "id": "h4",
                "title": "Messaging Relevance Impact",
                "description": "Specific value propositions outperform generic messaging",
                "driver": "Message Clarity / Value Proposition",
                "testable_prediction": "Creatives naming a concrete benefit should show higher CTR than generic statements",
                "supporting_evidence": [
                    "Creative messages are available for analysis",
                    "Specific messaging typically performs better"
                ],
                "confidence": 0.68,
                "confidence_reasoning": "Requires text analysis of creative messages"
            }
        ],
        "priority_ranking": [
            {"hypothesis_id": "h1", "priority_score": 0.85, "reason": "Audience fatigue is the most common driver of ROAS decline"},
            {"hypothesis_id": "h3", "priority_score": 0.75, "reason": "Audience quality directly impacts performance"},
            {"hypothesis_id": "h2", "priority_score": 0.70, "reason": "Creative format variation explains CTR differences"},
            {"hypothesis_id": "h4", "priority_score": 0.65, "reason": "Messaging is a secondary but actionable factor"}
        ],
        "reasoning": "Template hypotheses based on common ad performance drivers; hypothesis generation failed"
    })
}

pub fn evaluation(input: &FallbackInput<'_>) -> Value {
    let evaluations: Vec<Value> = input
        .context
        .array_at("hypotheses.hypotheses")
        .iter()
        .take(EVALUATED_HYPOTHESES)
        .map(|h| {
            let confidence = clamp_unit(h.get("confidence").and_then(Value::as_f64).unwrap_or(0.7));
            json!({
                "hypothesis_id": h.get("id").and_then(Value::as_str).unwrap_or("h_unknown"),
                "hypothesis_title": h.get("title").and_then(Value::as_str).unwrap_or("Unknown"),
                "validation_approach": "Comparative segment analysis",
                "supporting_metrics": ["Pattern consistent across segments"],
                "contradicting_metrics": ["Some segments show stable performance"],
                "confidence_score": confidence,
                "confidence_reasoning": "Carried over from hypothesis generation; not independently validated",
                "validation_status": "PARTIALLY_CONFIRMED",
                "actionability": input.policy.classify(confidence).describe(),
            })
        })
        .collect();

    json!({
        "evaluation_summary": "Hypotheses partially confirmed; recommend prioritized testing",
        "hypothesis_evaluations": evaluations,
        "top_validated_insights": [
            {
                "insight": "Audience fatigue appears to be a primary driver of ROAS decline",
                "confidence": 0.72,
                "impact": "Refresh creatives and expand audiences"
            }
        ],
        "recommended_actions": [
            "Increase creative variation frequency to combat audience fatigue",
            "Expand lookalike audience size and refresh weekly",
            "Test new creative messaging angles in control groups"
        ],
        "evaluation_methodology": "Segment comparison with trend analysis; deltas under 5% treated as noise"
    })
}

/// Per-campaign fallback; `item` is one low-CTR campaign row.
pub fn creative(input: &FallbackInput<'_>) -> Value {
    let campaign = input.item.unwrap_or(&Value::Null);
    json!({
        "low_performer_analysis": {
            "campaign_name": campaign.get("campaign_name").and_then(Value::as_str).unwrap_or("Unknown"),
            "current_ctr": campaign.get("ctr").and_then(Value::as_f64).unwrap_or(0.0),
            "current_messaging": campaign.get("creative_message").and_then(Value::as_str).unwrap_or("Unknown"),
            "performance_gap": "Below average CTR"
        },
        "creative_recommendations": [
            {
                "id": "rec_1",
                "headline": "Breathable comfort for your active lifestyle. Shop now",
                "creative_angle": "Lifestyle positioning with a concrete benefit",
                "value_prop": "Comfort and activity compatibility",
                "cta": "Shop now",
                "why_this_works": "Pairs a specific benefit with a use case and a clear CTA",
                "predicted_lift": "15-25%"
            },
            {
                "id": "rec_2",
                "headline": "Limited stock: best-selling comfort briefs back in store",
                "creative_angle": "Urgency and social proof",
                "value_prop": "Scarcity and bestseller status",
                "cta": "Get yours today",
                "why_this_works": "Urgency plus social proof with a direct CTA",
                "predicted_lift": "10-20%"
            },
            {
                "id": "rec_3",
                "headline": "No ride-up guarantee or your money back",
                "creative_angle": "Problem-solution with guarantee",
                "value_prop": "Specific pain point solved with risk reversal",
                "cta": "Try risk-free",
                "why_this_works": "Names a known pain point and removes purchase risk",
                "predicted_lift": "20-30%"
            }
        ],
        "implementation_priority": [
            {"recommendation_id": "rec_3", "priority": "HIGH"},
            {"recommendation_id": "rec_1", "priority": "MEDIUM"},
            {"recommendation_id": "rec_2", "priority": "MEDIUM"}
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input<'a>(ctx: &'a ExecutionContext, policy: &'a ActionabilityPolicy) -> FallbackInput<'a> {
        FallbackInput {
            task: "Why did ROAS drop?",
            context: ctx,
            item: None,
            policy,
        }
    }

    #[test]
    fn plan_echoes_query() {
        let ctx = ExecutionContext::new();
        let policy = ActionabilityPolicy::default();
        let plan = plan(&input(&ctx, &policy));
        assert_eq!(plan["query"], "Why did ROAS drop?");
        assert_eq!(plan["subtasks"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn evaluation_covers_first_three_hypotheses() {
        let policy = ActionabilityPolicy::default();
        let ctx = ExecutionContext::new().with(
            "hypotheses",
            json!({"hypotheses": [
                {"id": "a", "title": "A", "confidence": 0.9},
                {"id": "b", "title": "B", "confidence": 0.5},
                {"id": "c", "title": "C", "confidence": 0.1},
                {"id": "d", "title": "D"}
            ]}),
        );
        let eval = evaluation(&input(&ctx, &policy));
        let evals = eval["hypothesis_evaluations"].as_array().unwrap();
        assert_eq!(evals.len(), 3);
        assert_eq!(evals[0]["hypothesis_id"], "a");
        assert_eq!(evals[0]["actionability"], policy.classify(0.9).describe());
        assert_eq!(evals[1]["actionability"], policy.classify(0.5).describe());
        assert_eq!(evals[2]["actionability"], policy.classify(0.1).describe());
    }

    #[test]
    fn evaluation_clamps_out_of_range_confidence() {
        let policy = ActionabilityPolicy::default();
        let ctx = ExecutionContext::new().with(
            "hypotheses",
            json!({"hypotheses": [
                {"id": "hi", "title": "Over", "confidence": 1.4},
                {"id": "lo", "title": "Under", "confidence": -0.3}
            ]}),
        );
        let eval = evaluation(&input(&ctx, &policy));
        let evals = eval["hypothesis_evaluations"].as_array().unwrap();
        assert_eq!(evals[0]["confidence_score"], 1.0);
        assert_eq!(evals[1]["confidence_score"], 0.0);
        assert_eq!(evals[1]["actionability"], policy.classify(0.0).describe());
    }

    #[test]
    fn evaluation_without_hypotheses_still_recommends() {
        let ctx = ExecutionContext::new();
        let policy = ActionabilityPolicy::default();
        let eval = evaluation(&input(&ctx, &policy));
        assert!(eval["hypothesis_evaluations"].as_array().unwrap().is_empty());
        assert_eq!(eval["recommended_actions"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn creative_names_campaign() {
        let ctx = ExecutionContext::new();
        let policy = ActionabilityPolicy::default();
        let campaign = json!({"campaign_name": "Spring Sale", "ctr": 0.008, "creative_message": "Buy"});
        let mut fi = input(&ctx, &policy);
        fi.item = Some(&campaign);
        let rec = creative(&fi);
        assert_eq!(rec["low_performer_analysis"]["campaign_name"], "Spring Sale");
        assert_eq!(rec["creative_recommendations"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn data_findings_reuse_context() {
        let policy = ActionabilityPolicy::default();
        let ctx = ExecutionContext::new()
            .with("data_summary", json!({"row_count": 12}))
            .with("analysis", json!({"low_ctr_count": 4}));
        let findings = data_findings(&input(&ctx, &policy));
        assert_eq!(findings["summary"]["row_count"], 12);
        let obs = findings["trend_observations"].as_array().unwrap();
        assert_eq!(obs.len(), 3);
    }
}
