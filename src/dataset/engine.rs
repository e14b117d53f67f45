//! DatasetEngine: loads the performance export and answers aggregate queries

use super::record::{parse_date, CsvRow, DatasetRecord};
use super::summary::{self, DatasetSummary, Dimension, GroupPerformance, TimelinePoint};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while loading a dataset
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("dataset not found: {0}")]
    NotFound(PathBuf),

    #[error("invalid date {value:?} on row {row}")]
    InvalidDate { row: usize, value: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type for dataset operations
pub type DatasetResult<T> = Result<T, DatasetError>;

/// How much of the file to keep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Keep only the first N records after sorting (development only)
    pub sample_size: Option<usize>,
}

impl LoadOptions {
    pub fn full() -> Self {
        Self::default()
    }

    pub fn sampled(size: usize) -> Self {
        Self {
            sample_size: Some(size),
        }
    }
}

/// An immutable, date-ordered dataset with its summary.
///
/// The summary is computed once at construction; the records are never
/// mutated afterwards, so every query reflects the loaded state.
#[derive(Debug, Clone)]
pub struct DatasetEngine {
    records: Vec<DatasetRecord>,
    summary: DatasetSummary,
}

impl DatasetEngine {
    /// Load a CSV export, sort it by date and optionally truncate it.
    pub fn load(path: impl AsRef<Path>, options: LoadOptions) -> DatasetResult<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(DatasetError::NotFound(path.to_path_buf()));
        }

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)?;

        let mut records = Vec::new();
        for (idx, row) in reader.deserialize::<CsvRow>().enumerate() {
            let row = row?;
            // Header is line 1; data rows start at 2.
            let date = parse_date(&row.date).ok_or_else(|| DatasetError::InvalidDate {
                row: idx + 2,
                value: row.date.clone(),
            })?;
            records.push(row.into_record(date));
        }

        let engine = Self::from_records_sampled(records, options.sample_size);
        tracing::debug!(
            path = %path.display(),
            rows = engine.records.len(),
            "dataset loaded"
        );
        Ok(engine)
    }

    /// Build an engine over in-memory records.
    pub fn from_records(records: Vec<DatasetRecord>) -> Self {
        Self::from_records_sampled(records, None)
    }

    fn from_records_sampled(mut records: Vec<DatasetRecord>, sample_size: Option<usize>) -> Self {
        // Stable: rows sharing a date keep file order.
        records.sort_by_key(|r| r.date);
        if let Some(n) = sample_size {
            records.truncate(n);
        }
        let summary = DatasetSummary::compute(&records);
        Self { records, summary }
    }

    /// All records, ascending by date
    pub fn records(&self) -> &[DatasetRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn summarize(&self) -> &DatasetSummary {
        &self.summary
    }

    /// Records with ctr strictly below `threshold`.
    pub fn filter_low_ctr(&self, threshold: f64) -> Vec<&DatasetRecord> {
        self.records.iter().filter(|r| r.ctr < threshold).collect()
    }

    /// Records dated within `[start, end]`.
    pub fn filter_date_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<&DatasetRecord> {
        self.records
            .iter()
            .filter(|r| r.date >= start && r.date <= end)
            .collect()
    }

    pub fn campaign_records(&self, campaign_name: &str) -> Vec<&DatasetRecord> {
        self.records
            .iter()
            .filter(|r| r.campaign_name == campaign_name)
            .collect()
    }

    /// Per-day totals with ctr/roas derived from the sums.
    pub fn timeline(&self) -> Vec<TimelinePoint> {
        summary::timeline(&self.records)
    }

    pub fn performance_by(&self, dimension: Dimension) -> BTreeMap<String, GroupPerformance> {
        summary::performance_by(&self.records, dimension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn write_csv(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("ads.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        path
    }

    const CSV: &str = "\
campaign_name,adset_name,date,spend,impressions,clicks,ctr,purchases,revenue,roas,creative_type,creative_message,audience_type,platform,country
Men Comfort,Adset A,2025-01-03,100,10000,150,0.015,5,300,3.0,Video,Breathable all day,Broad,Facebook,US
Women Seamless,Adset B,2025-01-01,50,5000,40,,2,80,,Image,\"Soft, seamless fit\",Lookalike,Instagram,UK
Men Comfort,Adset A,2025-01-02,80,8000,60,0.0075,1,40,0.5,Video,Breathable all day,Broad,Facebook,US
";

    #[test]
    fn load_sorts_by_date_and_derives_missing_ratios() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, CSV);

        let engine = DatasetEngine::load(&path, LoadOptions::full()).unwrap();
        let dates: Vec<_> = engine.records().iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![day(1), day(2), day(3)]);

        let women = &engine.records()[0];
        assert_eq!(women.creative_message.as_deref(), Some("Soft, seamless fit"));
        assert_eq!(women.ctr, 40.0 / 5000.0);
        assert_eq!(women.roas, 80.0 / 50.0);
        assert_eq!(women.platform.as_deref(), Some("Instagram"));
    }

    #[test]
    fn missing_path_is_not_found() {
        let err = DatasetEngine::load("/definitely/not/here.csv", LoadOptions::full()).unwrap_err();
        assert!(matches!(err, DatasetError::NotFound(_)));
    }

    #[test]
    fn bad_date_reports_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "campaign_name,date,spend,impressions,clicks,revenue\nA,2025-01-01,1,1,1,1\nB,soon,1,1,1,1\n",
        );
        let err = DatasetEngine::load(&path, LoadOptions::full()).unwrap_err();
        assert!(matches!(err, DatasetError::InvalidDate { row: 3, .. }));
    }

    #[test]
    fn sampling_keeps_first_records_after_sort() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, CSV);

        let engine = DatasetEngine::load(&path, LoadOptions::sampled(2)).unwrap();
        assert_eq!(engine.len(), 2);
        assert_eq!(engine.summarize().row_count, 2);
        assert_eq!(engine.records()[1].date, day(2));
    }

    #[test]
    fn loading_twice_gives_identical_summaries() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, CSV);

        let a = DatasetEngine::load(&path, LoadOptions::full()).unwrap();
        let b = DatasetEngine::load(&path, LoadOptions::full()).unwrap();
        assert_eq!(a.summarize(), b.summarize());
        assert_eq!(
            a.summarize().performance_metrics.avg_roas.to_bits(),
            b.summarize().performance_metrics.avg_roas.to_bits()
        );
    }

    #[test]
    fn summary_aggregates() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, CSV);
        let engine = DatasetEngine::load(&path, LoadOptions::full()).unwrap();
        let s = engine.summarize();

        assert_eq!(s.row_count, 3);
        assert_eq!(
            s.date_range,
            Some(summary::DateRange { start: day(1), end: day(3) })
        );
        assert_eq!(s.campaigns, vec!["Women Seamless", "Men Comfort"]);
        assert_eq!(s.countries, vec!["UK", "US"]);
        assert_eq!(s.performance_metrics.total_spend, 230.0);
        assert_eq!(s.performance_metrics.total_impressions, 23000);
        assert_eq!(s.performance_metrics.total_clicks, 250);
        assert_eq!(s.performance_metrics.total_purchases, 8);
        assert_eq!(s.performance_metrics.max_roas, 3.0);
        assert_eq!(s.performance_metrics.min_roas, 0.5);
        assert_eq!(s.performance_metrics.min_ctr, 0.0075);
    }

    #[test]
    fn empty_summary_is_zeroed() {
        let engine = DatasetEngine::from_records(Vec::new());
        let s = engine.summarize();
        assert_eq!(s.row_count, 0);
        assert!(s.date_range.is_none());
        assert_eq!(s.performance_metrics.avg_ctr, 0.0);
        assert!(engine.timeline().is_empty());
    }

    #[test]
    fn low_ctr_filter_excludes_boundary() {
        let engine = DatasetEngine::from_records(vec![
            DatasetRecord::new("low", day(1), 10.0, 1000, 10, 5.0),
            DatasetRecord::new("edge", day(1), 10.0, 1000, 12, 5.0),
            DatasetRecord::new("high", day(1), 10.0, 1000, 15, 5.0),
        ]);

        let low = engine.filter_low_ctr(0.012);
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].campaign_name, "low");
        assert_eq!(low[0].ctr, 0.01);
    }

    #[test]
    fn timeline_recomputes_ratio_after_summing() {
        let engine = DatasetEngine::from_records(vec![
            DatasetRecord::new("a", day(5), 10.0, 100, 1, 5.0),
            DatasetRecord::new("b", day(5), 20.0, 300, 9, 30.0),
            DatasetRecord::new("c", day(6), 0.0, 0, 0, 0.0),
        ]);

        let timeline = engine.timeline();
        assert_eq!(timeline.len(), 2);

        let first = &timeline[0];
        assert_eq!(first.date, day(5));
        assert_eq!(first.spend, 30.0);
        assert_eq!(first.revenue, 35.0);
        assert!((first.roas - 35.0 / 30.0).abs() < 1e-12);
        // Mean of per-record roas would be (0.5 + 1.5) / 2 = 1.0
        assert!((first.roas - 1.0).abs() > 0.1);
        assert_eq!(first.ctr, 10.0 / 400.0);

        assert_eq!(timeline[1].roas, 0.0);
        assert_eq!(timeline[1].ctr, 0.0);
    }

    #[test]
    fn performance_by_campaign_and_creative() {
        let engine = DatasetEngine::from_records(vec![
            DatasetRecord::new("A", day(1), 10.0, 1000, 10, 20.0).with_creative("Video", "m1"),
            DatasetRecord::new("A", day(2), 10.0, 1000, 30, 40.0).with_creative("Image", "m2"),
            DatasetRecord::new("B", day(1), 10.0, 1000, 20, 10.0).with_creative("Video", "m3"),
        ]);

        let by_campaign = engine.performance_by(Dimension::Campaign);
        assert_eq!(by_campaign.len(), 2);
        let a = &by_campaign["A"];
        assert_eq!(a.count, 2);
        assert!((a.mean_ctr - 0.02).abs() < 1e-12);
        assert!((a.mean_roas - 3.0).abs() < 1e-12);
        assert_eq!(a.total_spend, 20.0);

        let by_creative = engine.performance_by(Dimension::CreativeType);
        assert_eq!(by_creative["Video"].count, 2);
        assert_eq!(by_creative["Image"].count, 1);
    }

    #[test]
    fn date_range_and_campaign_filters() {
        let engine = DatasetEngine::from_records(vec![
            DatasetRecord::new("A", day(1), 1.0, 1, 1, 1.0),
            DatasetRecord::new("B", day(2), 1.0, 1, 1, 1.0),
            DatasetRecord::new("A", day(3), 1.0, 1, 1, 1.0),
        ]);
        assert_eq!(engine.filter_date_range(day(2), day(3)).len(), 2);
        assert_eq!(engine.campaign_records("A").len(), 2);
        assert!(engine.campaign_records("Z").is_empty());
    }
}
