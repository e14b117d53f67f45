//! Analysis bundle handed to the reasoning stages

use super::engine::DatasetEngine;
use super::summary::{Dimension, GroupPerformance, TimelinePoint};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Timeline entries included in the bundle.
pub const TIMELINE_ENTRIES: usize = 10;

/// Low-CTR rows included in the bundle.
pub const LOW_CTR_ROWS: usize = 5;

/// Sections of the analysis bundle that can be requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    CampaignPerformance,
    CreativePerformance,
    RoasTimeline,
    LowCtrCampaigns,
}

impl AnalysisKind {
    pub const ALL: [AnalysisKind; 4] = [
        Self::CampaignPerformance,
        Self::CreativePerformance,
        Self::RoasTimeline,
        Self::LowCtrCampaigns,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Self::CampaignPerformance => "campaign_performance",
            Self::CreativePerformance => "creative_performance",
            Self::RoasTimeline => "roas_timeline",
            Self::LowCtrCampaigns => "low_ctr_campaigns",
        }
    }

    pub fn parse(key: &str) -> Option<AnalysisKind> {
        Self::ALL.into_iter().find(|k| k.key() == key)
    }
}

/// A distinct under-performing campaign/adset/message combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LowCtrCampaign {
    pub campaign_name: String,
    pub adset_name: String,
    pub ctr: f64,
    pub creative_message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisBundle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign_performance: Option<BTreeMap<String, GroupPerformance>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creative_performance: Option<BTreeMap<String, GroupPerformance>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roas_timeline: Option<Vec<TimelinePoint>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low_ctr_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low_ctr_campaigns: Option<Vec<LowCtrCampaign>>,
}

impl AnalysisBundle {
    /// Compute the requested sections; an empty request means all of them.
    pub fn compute(engine: &DatasetEngine, requested: &[AnalysisKind], low_ctr_threshold: f64) -> Self {
        let wants = |kind: AnalysisKind| requested.is_empty() || requested.contains(&kind);
        let mut bundle = Self::default();

        if wants(AnalysisKind::CampaignPerformance) {
            bundle.campaign_performance = Some(engine.performance_by(Dimension::Campaign));
        }
        if wants(AnalysisKind::CreativePerformance) {
            bundle.creative_performance = Some(engine.performance_by(Dimension::CreativeType));
        }
        if wants(AnalysisKind::RoasTimeline) {
            let mut timeline = engine.timeline();
            timeline.truncate(TIMELINE_ENTRIES);
            bundle.roas_timeline = Some(timeline);
        }
        if wants(AnalysisKind::LowCtrCampaigns) {
            let low = engine.filter_low_ctr(low_ctr_threshold);
            bundle.low_ctr_count = Some(low.len());

            let mut seen = HashSet::new();
            let rows = low
                .into_iter()
                .filter(|r| {
                    seen.insert((
                        r.campaign_name.as_str(),
                        r.adset_name.as_str(),
                        r.ctr.to_bits(),
                        r.creative_message.as_deref(),
                    ))
                })
                .take(LOW_CTR_ROWS)
                .map(|r| LowCtrCampaign {
                    campaign_name: r.campaign_name.clone(),
                    adset_name: r.adset_name.clone(),
                    ctr: r.ctr,
                    creative_message: r.creative_message.clone(),
                })
                .collect();
            bundle.low_ctr_campaigns = Some(rows);
        }

        bundle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::DatasetRecord;
    use chrono::NaiveDate;

    fn engine() -> DatasetEngine {
        let d = |n| NaiveDate::from_ymd_opt(2025, 3, n).unwrap();
        let mut records = Vec::new();
        for day in 1..=12 {
            records.push(
                DatasetRecord::new("Winners", d(day), 100.0, 10_000, 300, 400.0)
                    .with_creative("Video", "Breathable all day"),
            );
        }
        // Two identical low-CTR rows collapse into one
        for _ in 0..2 {
            records.push(
                DatasetRecord::new("Laggards", d(1), 50.0, 10_000, 50, 40.0)
                    .with_adset("Broad")
                    .with_creative("Image", "Generic comfort"),
            );
        }
        DatasetEngine::from_records(records)
    }

    #[test]
    fn full_bundle() {
        let bundle = AnalysisBundle::compute(&engine(), &[], 0.012);

        assert_eq!(bundle.campaign_performance.as_ref().unwrap().len(), 2);
        assert_eq!(bundle.creative_performance.as_ref().unwrap().len(), 2);
        assert_eq!(bundle.roas_timeline.as_ref().unwrap().len(), TIMELINE_ENTRIES);
        assert_eq!(bundle.low_ctr_count, Some(2));

        let low = bundle.low_ctr_campaigns.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].campaign_name, "Laggards");
        assert_eq!(low[0].creative_message.as_deref(), Some("Generic comfort"));
    }

    #[test]
    fn requested_sections_only() {
        let bundle = AnalysisBundle::compute(&engine(), &[AnalysisKind::RoasTimeline], 0.012);
        assert!(bundle.campaign_performance.is_none());
        assert!(bundle.low_ctr_campaigns.is_none());

        let json = serde_json::to_value(&bundle).unwrap();
        assert_eq!(json.as_object().unwrap().len(), 1);
    }

    #[test]
    fn parse_kind() {
        assert_eq!(AnalysisKind::parse("roas_timeline"), Some(AnalysisKind::RoasTimeline));
        assert_eq!(AnalysisKind::parse("nope"), None);
    }
}
