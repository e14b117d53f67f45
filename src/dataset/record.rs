//! One row of advertising performance facts

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Divide, yielding 0.0 instead of NaN/inf when the denominator is zero.
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    let value = numerator / denominator;
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// A single dated performance record for one campaign/adset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub campaign_name: String,
    pub adset_name: String,
    pub creative_type: String,
    pub audience_type: String,
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creative_message: Option<String>,
    pub date: NaiveDate,
    pub spend: f64,
    pub impressions: u64,
    pub clicks: u64,
    pub purchases: u64,
    pub revenue: f64,
    /// clicks / impressions
    pub ctr: f64,
    /// revenue / spend
    pub roas: f64,
}

impl DatasetRecord {
    /// Create a record with derived ctr/roas and empty dimensions.
    pub fn new(
        campaign_name: impl Into<String>,
        date: NaiveDate,
        spend: f64,
        impressions: u64,
        clicks: u64,
        revenue: f64,
    ) -> Self {
        Self {
            campaign_name: campaign_name.into(),
            adset_name: String::new(),
            creative_type: String::new(),
            audience_type: String::new(),
            country: String::new(),
            platform: None,
            creative_message: None,
            date,
            spend,
            impressions,
            clicks,
            purchases: 0,
            revenue,
            ctr: ratio(clicks as f64, impressions as f64),
            roas: ratio(revenue, spend),
        }
    }

    pub fn with_adset(mut self, adset: impl Into<String>) -> Self {
        self.adset_name = adset.into();
        self
    }

    pub fn with_creative(mut self, creative_type: impl Into<String>, message: impl Into<String>) -> Self {
        self.creative_type = creative_type.into();
        self.creative_message = Some(message.into());
        self
    }

    pub fn with_audience(mut self, audience_type: impl Into<String>) -> Self {
        self.audience_type = audience_type.into();
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = country.into();
        self
    }

    pub fn with_purchases(mut self, purchases: u64) -> Self {
        self.purchases = purchases;
        self
    }
}

/// A CSV row as written by the export, before normalisation.
///
/// Counts are read as floats because exports sometimes write `120.0`.
/// `ctr`/`roas` columns are optional; when absent they are derived.
#[derive(Debug, Deserialize)]
pub(crate) struct CsvRow {
    pub campaign_name: String,
    #[serde(default)]
    pub adset_name: String,
    pub date: String,
    #[serde(default)]
    pub spend: f64,
    #[serde(default)]
    pub impressions: f64,
    #[serde(default)]
    pub clicks: f64,
    #[serde(default)]
    pub ctr: Option<f64>,
    #[serde(default)]
    pub purchases: f64,
    #[serde(default)]
    pub revenue: f64,
    #[serde(default)]
    pub roas: Option<f64>,
    #[serde(default)]
    pub creative_type: String,
    #[serde(default)]
    pub creative_message: Option<String>,
    #[serde(default)]
    pub audience_type: String,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub country: String,
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%m-%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Parse a date cell into a calendar date.
pub(crate) fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
                .map(|dt| dt.date())
        })
}

fn count(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.round() as u64
    } else {
        0
    }
}

impl CsvRow {
    pub(crate) fn into_record(self, date: NaiveDate) -> DatasetRecord {
        let impressions = count(self.impressions);
        let clicks = count(self.clicks);
        let ctr = self
            .ctr
            .filter(|v| v.is_finite())
            .unwrap_or_else(|| ratio(clicks as f64, impressions as f64));
        let roas = self
            .roas
            .filter(|v| v.is_finite())
            .unwrap_or_else(|| ratio(self.revenue, self.spend));

        DatasetRecord {
            campaign_name: self.campaign_name,
            adset_name: self.adset_name,
            creative_type: self.creative_type,
            audience_type: self.audience_type,
            country: self.country,
            platform: self.platform.filter(|s| !s.is_empty()),
            creative_message: self.creative_message.filter(|s| !s.is_empty()),
            date,
            spend: self.spend,
            impressions,
            clicks,
            purchases: count(self.purchases),
            revenue: self.revenue,
            ctr,
            roas,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_with_zero_denominator_is_zero() {
        assert_eq!(ratio(5.0, 0.0), 0.0);
        assert_eq!(ratio(0.0, 0.0), 0.0);
        assert_eq!(ratio(3.0, 2.0), 1.5);
    }

    #[test]
    fn new_record_derives_ratios() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let r = DatasetRecord::new("c", date, 20.0, 1000, 12, 30.0);
        assert_eq!(r.ctr, 0.012);
        assert_eq!(r.roas, 1.5);

        let idle = DatasetRecord::new("c", date, 0.0, 0, 0, 0.0);
        assert_eq!(idle.ctr, 0.0);
        assert_eq!(idle.roas, 0.0);
    }

    #[test]
    fn parses_common_date_layouts() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 7);
        assert_eq!(parse_date("2025-03-07"), expected);
        assert_eq!(parse_date("2025/03/07"), expected);
        assert_eq!(parse_date("03/07/2025"), expected);
        assert_eq!(parse_date("2025-03-07 13:45:00"), expected);
        assert_eq!(parse_date(" 2025-03-07T00:00:00 "), expected);
        assert_eq!(parse_date("yesterday"), None);
    }
}
