//! Application configuration
//!
//! Loaded once from a YAML document at process start and passed by reference
//! to the orchestrator. Every section has defaults, so a partial document (or
//! an empty one) is valid; only a missing or unreadable file is an error.

use crate::llm::SamplingParams;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub model: ModelConfig,
    pub agents: AgentsConfig,
    pub data: DataConfig,
    pub thresholds: ThresholdsConfig,
    pub output: OutputConfig,
    pub prompts: PromptsConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    /// Parse configuration from YAML text. An empty document yields defaults.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        match serde_yaml::from_str(text)? {
            serde_yaml::Value::Null => Ok(Self::default()),
            doc => Ok(serde_yaml::from_value(doc)?),
        }
    }

    pub fn actionability_policy(&self) -> ActionabilityPolicy {
        ActionabilityPolicy {
            actionable_confidence: self.thresholds.actionable_confidence,
            exploratory_confidence: self.thresholds.exploratory_confidence,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub name: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: "gemini-2.0-flash".to_string(),
            api_key_env: "GOOGLE_API_KEY".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout_secs: 120,
        }
    }
}

/// Sampling settings for one reasoning role
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_max_tokens() -> u32 {
    2048
}

impl AgentConfig {
    fn with_temperature(temperature: f32) -> Self {
        Self {
            temperature,
            max_tokens: default_max_tokens(),
        }
    }

    pub fn sampling(&self) -> SamplingParams {
        SamplingParams::new(self.temperature, self.max_tokens)
    }
}

fn planner_defaults() -> AgentConfig {
    AgentConfig::with_temperature(0.3)
}

fn data_agent_defaults() -> AgentConfig {
    AgentConfig::with_temperature(0.2)
}

fn insight_defaults() -> AgentConfig {
    AgentConfig::with_temperature(0.7)
}

fn evaluator_defaults() -> AgentConfig {
    AgentConfig::with_temperature(0.2)
}

fn creative_defaults() -> AgentConfig {
    AgentConfig::with_temperature(0.8)
}

/// Per-role sampling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentsConfig {
    #[serde(default = "planner_defaults")]
    pub planner: AgentConfig,
    #[serde(default = "data_agent_defaults")]
    pub data_agent: AgentConfig,
    #[serde(default = "insight_defaults")]
    pub insight_agent: AgentConfig,
    #[serde(default = "evaluator_defaults")]
    pub evaluator: AgentConfig,
    #[serde(default = "creative_defaults")]
    pub creative_generator: AgentConfig,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            planner: planner_defaults(),
            data_agent: data_agent_defaults(),
            insight_agent: insight_defaults(),
            evaluator: evaluator_defaults(),
            creative_generator: creative_defaults(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub dataset_path: PathBuf,
    /// Truncate the dataset to its first `sample_size` rows (development only)
    pub sample_mode: bool,
    pub sample_size: usize,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from("data/synthetic_fb_ads_undergarments.csv"),
            sample_mode: false,
            sample_size: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdsConfig {
    /// Records with ctr strictly below this are low performers
    pub low_ctr: f64,
    pub actionable_confidence: f64,
    pub exploratory_confidence: f64,
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            low_ctr: 0.012,
            actionable_confidence: 0.6,
            exploratory_confidence: 0.4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub insights_path: PathBuf,
    pub creatives_path: PathBuf,
    pub report_path: PathBuf,
    pub logs_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            insights_path: PathBuf::from("reports/insights.json"),
            creatives_path: PathBuf::from("reports/creatives.json"),
            report_path: PathBuf::from("reports/report.md"),
            logs_path: PathBuf::from("logs"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    /// Directory holding `<role>.md` instruction templates
    pub dir: PathBuf,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("prompts"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `tracing` filter when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// How strongly a validated hypothesis should drive action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actionability {
    /// Confident enough to act on
    Act,
    /// Worth a controlled test before acting
    Test,
    /// Keep watching; not enough evidence
    Monitor,
}

impl Actionability {
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Act => "Sufficient confidence to recommend remediation",
            Self::Test => "Run a controlled test before committing budget",
            Self::Monitor => "Insufficient evidence; keep monitoring",
        }
    }
}

/// Maps a confidence score to an `Actionability` tier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionabilityPolicy {
    pub actionable_confidence: f64,
    pub exploratory_confidence: f64,
}

impl Default for ActionabilityPolicy {
    fn default() -> Self {
        let t = ThresholdsConfig::default();
        Self {
            actionable_confidence: t.actionable_confidence,
            exploratory_confidence: t.exploratory_confidence,
        }
    }
}

impl ActionabilityPolicy {
    pub fn classify(&self, confidence: f64) -> Actionability {
        if confidence >= self.actionable_confidence {
            Actionability::Act
        } else if confidence >= self.exploratory_confidence {
            Actionability::Test
        } else {
            Actionability::Monitor
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = AppConfig::from_yaml_str("").unwrap();
        assert_eq!(config.model.name, "gemini-2.0-flash");
        assert_eq!(config.agents.planner.temperature, 0.3);
        assert_eq!(config.agents.creative_generator.temperature, 0.8);
        assert_eq!(config.thresholds.low_ctr, 0.012);
        assert!(!config.data.sample_mode);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let yaml = r#"
agents:
  evaluator:
    temperature: 0.1
data:
  dataset_path: other.csv
  sample_mode: true
"#;
        let config = AppConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.agents.evaluator.temperature, 0.1);
        assert_eq!(config.agents.evaluator.max_tokens, 2048);
        assert_eq!(config.agents.insight_agent.temperature, 0.7);
        assert_eq!(config.data.dataset_path, PathBuf::from("other.csv"));
        assert!(config.data.sample_mode);
        assert_eq!(config.data.sample_size, 100);
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load(dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn malformed_yaml_is_parse_error() {
        let err = AppConfig::from_yaml_str("agents: [unclosed").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn policy_tiers() {
        let policy = ActionabilityPolicy::default();
        assert_eq!(policy.classify(0.75), Actionability::Act);
        assert_eq!(policy.classify(0.6), Actionability::Act);
        assert_eq!(policy.classify(0.5), Actionability::Test);
        assert_eq!(policy.classify(0.1), Actionability::Monitor);
    }

    #[test]
    fn shipped_config_parses() {
        let config = AppConfig::from_yaml_str(include_str!("../config/config.yaml")).unwrap();
        assert_eq!(config.model.api_key_env, "GOOGLE_API_KEY");
        assert_eq!(config.output.logs_path, PathBuf::from("logs"));
        assert_eq!(config.agents.data_agent.sampling().temperature, 0.2);
    }
}
