//! Shared fixtures for pipeline integration tests
//!
//! A `Workspace` owns a temp directory holding a small three-campaign
//! dataset and an `AppConfig` whose outputs all point inside it.

#![allow(dead_code)]

use ad_analyst::AppConfig;
use std::path::PathBuf;
use tempfile::TempDir;

/// Three campaigns over three days. Alpha performs well; Beta and Gamma sit
/// below the default 0.012 CTR threshold with one message each.
pub const THREE_CAMPAIGNS_CSV: &str = "\
campaign_name,adset_name,date,spend,impressions,clicks,purchases,revenue,creative_type,creative_message,audience_type,platform,country
Alpha,Lookalike 1%,2025-03-01,100,10000,300,12,420,Video,Breathable comfort all day,Lookalike,Facebook,US
Beta,Broad,2025-03-01,80,10000,80,2,60,Image,Generic comfort for everyone,Broad,Instagram,US
Gamma,Interest,2025-03-01,60,10000,100,3,90,UGC,Soft fabric,Interest,Facebook,UK
Alpha,Lookalike 1%,2025-03-02,100,10000,280,11,390,Video,Breathable comfort all day,Lookalike,Facebook,US
Beta,Broad,2025-03-02,80,10000,80,1,40,Image,Generic comfort for everyone,Broad,Instagram,US
Gamma,Interest,2025-03-02,60,10000,100,2,70,UGC,Soft fabric,Interest,Facebook,UK
Alpha,Lookalike 1%,2025-03-03,100,10000,260,10,350,Video,Breathable comfort all day,Lookalike,Facebook,US
Beta,Broad,2025-03-03,80,10000,80,1,30,Image,Generic comfort for everyone,Broad,Instagram,US
Gamma,Interest,2025-03-03,60,10000,100,2,50,UGC,Soft fabric,Interest,Facebook,UK
";

pub struct Workspace {
    pub dir: TempDir,
    pub config: AppConfig,
}

impl Workspace {
    /// Workspace with the three-campaign dataset written to `data/ads.csv`.
    pub fn new() -> Self {
        let ws = Self::without_dataset();
        let path = ws.dataset_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, THREE_CAMPAIGNS_CSV).unwrap();
        ws
    }

    /// Workspace whose configured dataset does not exist.
    pub fn without_dataset() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.data.dataset_path = dir.path().join("data/ads.csv");
        config.output.insights_path = dir.path().join("reports/insights.json");
        config.output.creatives_path = dir.path().join("reports/creatives.json");
        config.output.report_path = dir.path().join("reports/report.md");
        config.output.logs_path = dir.path().join("logs");
        config.prompts.dir = dir.path().join("prompts");
        Self { dir, config }
    }

    pub fn dataset_path(&self) -> PathBuf {
        self.config.data.dataset_path.clone()
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.dir.path().join("reports")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.dir.path().join("logs")
    }

    pub fn read(&self, path: &PathBuf) -> String {
        std::fs::read_to_string(path).unwrap()
    }

    /// Write `config.yaml` pointing at this workspace and return its path.
    pub fn write_config_yaml(&self, extra: &str) -> PathBuf {
        let root = self.dir.path().display();
        let yaml = format!(
            "\
data:
  dataset_path: {root}/data/ads.csv
output:
  insights_path: {root}/reports/insights.json
  creatives_path: {root}/reports/creatives.json
  report_path: {root}/reports/report.md
  logs_path: {root}/logs
prompts:
  dir: {root}/prompts
{extra}"
        );
        let path = self.dir.path().join("config.yaml");
        std::fs::write(&path, yaml).unwrap();
        path
    }
}

/// One response that every role can extract a non-empty record from.
pub const UNIVERSAL_RESPONSE: &str = r#"```json
{
  "subtasks": [{"id": "task_1", "title": "Summarise"}],
  "summary": "ok",
  "hypotheses": [
    {"id": "h1", "title": "Audience Fatigue", "confidence": 0.82},
    {"id": "h2", "title": "Weak Messaging", "confidence": 0.45}
  ],
  "hypothesis_evaluations": [
    {"hypothesis_id": "h1", "hypothesis_title": "Audience Fatigue", "validation_status": "CONFIRMED", "confidence_score": 0.82}
  ],
  "recommended_actions": ["Rotate creatives weekly"],
  "creative_recommendations": [
    {"id": "rec_1", "headline": "Feel the difference", "creative_angle": "Benefit", "predicted_lift": "12%"}
  ]
}
```"#;
