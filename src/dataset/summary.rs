//! Aggregate views over a loaded dataset

use super::record::{ratio, DatasetRecord};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Inclusive date span covered by a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Totals and ratio statistics over every record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_spend: f64,
    pub total_impressions: u64,
    pub total_clicks: u64,
    pub total_purchases: u64,
    pub total_revenue: f64,
    pub avg_ctr: f64,
    pub min_ctr: f64,
    pub max_ctr: f64,
    pub avg_roas: f64,
    pub min_roas: f64,
    pub max_roas: f64,
}

/// Read-only snapshot computed once per load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub row_count: usize,
    pub date_range: Option<DateRange>,
    pub campaigns: Vec<String>,
    pub adsets: Vec<String>,
    pub creative_types: Vec<String>,
    pub audience_types: Vec<String>,
    pub countries: Vec<String>,
    pub performance_metrics: PerformanceMetrics,
}

/// Distinct values in first-seen order.
fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .filter(|v| seen.insert(*v))
        .map(str::to_string)
        .collect()
}

/// (mean, min, max) of a series; all zero when empty.
pub(crate) fn stats(values: impl Iterator<Item = f64>) -> (f64, f64, f64) {
    let mut n = 0usize;
    let mut sum = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values {
        n += 1;
        sum += v;
        min = min.min(v);
        max = max.max(v);
    }
    if n == 0 {
        (0.0, 0.0, 0.0)
    } else {
        (sum / n as f64, min, max)
    }
}

impl DatasetSummary {
    pub fn compute(records: &[DatasetRecord]) -> Self {
        let date_range = match (records.iter().map(|r| r.date).min(), records.iter().map(|r| r.date).max()) {
            (Some(start), Some(end)) => Some(DateRange { start, end }),
            _ => None,
        };

        let (avg_ctr, min_ctr, max_ctr) = stats(records.iter().map(|r| r.ctr));
        let (avg_roas, min_roas, max_roas) = stats(records.iter().map(|r| r.roas));

        let performance_metrics = PerformanceMetrics {
            total_spend: records.iter().map(|r| r.spend).sum(),
            total_impressions: records.iter().map(|r| r.impressions).sum(),
            total_clicks: records.iter().map(|r| r.clicks).sum(),
            total_purchases: records.iter().map(|r| r.purchases).sum(),
            total_revenue: records.iter().map(|r| r.revenue).sum(),
            avg_ctr,
            min_ctr,
            max_ctr,
            avg_roas,
            min_roas,
            max_roas,
        };

        Self {
            row_count: records.len(),
            date_range,
            campaigns: distinct(records.iter().map(|r| r.campaign_name.as_str())),
            adsets: distinct(records.iter().map(|r| r.adset_name.as_str())),
            creative_types: distinct(records.iter().map(|r| r.creative_type.as_str())),
            audience_types: distinct(records.iter().map(|r| r.audience_type.as_str())),
            countries: distinct(records.iter().map(|r| r.country.as_str())),
            performance_metrics,
        }
    }
}

/// One day of summed activity with ratios recomputed after summing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelinePoint {
    pub date: NaiveDate,
    pub spend: f64,
    pub revenue: f64,
    pub impressions: u64,
    pub clicks: u64,
    pub roas: f64,
    pub ctr: f64,
}

pub(crate) fn timeline(records: &[DatasetRecord]) -> Vec<TimelinePoint> {
    let mut by_date: BTreeMap<NaiveDate, (f64, f64, u64, u64)> = BTreeMap::new();
    for r in records {
        let entry = by_date.entry(r.date).or_default();
        entry.0 += r.spend;
        entry.1 += r.revenue;
        entry.2 += r.impressions;
        entry.3 += r.clicks;
    }

    by_date
        .into_iter()
        .map(|(date, (spend, revenue, impressions, clicks))| TimelinePoint {
            date,
            spend,
            revenue,
            impressions,
            clicks,
            roas: ratio(revenue, spend),
            ctr: ratio(clicks as f64, impressions as f64),
        })
        .collect()
}

/// Mean ratios for one value of a grouping dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupPerformance {
    pub mean_ctr: f64,
    pub mean_roas: f64,
    pub count: usize,
    pub total_spend: f64,
}

/// Dimension a dataset can be grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Campaign,
    Adset,
    CreativeType,
    AudienceType,
    Country,
}

impl Dimension {
    pub fn value_of<'a>(&self, record: &'a DatasetRecord) -> &'a str {
        match self {
            Self::Campaign => &record.campaign_name,
            Self::Adset => &record.adset_name,
            Self::CreativeType => &record.creative_type,
            Self::AudienceType => &record.audience_type,
            Self::Country => &record.country,
        }
    }
}

pub(crate) fn performance_by(
    records: &[DatasetRecord],
    dimension: Dimension,
) -> BTreeMap<String, GroupPerformance> {
    let mut groups: BTreeMap<String, Vec<&DatasetRecord>> = BTreeMap::new();
    for r in records {
        groups
            .entry(dimension.value_of(r).to_string())
            .or_default()
            .push(r);
    }

    groups
        .into_iter()
        .map(|(key, rows)| {
            let (mean_ctr, _, _) = stats(rows.iter().map(|r| r.ctr));
            let (mean_roas, _, _) = stats(rows.iter().map(|r| r.roas));
            let perf = GroupPerformance {
                mean_ctr,
                mean_roas,
                count: rows.len(),
                total_spend: rows.iter().map(|r| r.spend).sum(),
            };
            (key, perf)
        })
        .collect()
}
