//! ad-analyst CLI: run the diagnosis pipeline over a dataset.
//!
//! Usage:
//!   ad-analyst [--config path] [QUERY...]

use ad_analyst::{
    AppConfig, FileTemplateStore, GeminiClient, GeminiConfig, GenerationClient, MockClient,
    Orchestrator, RunOutcome, DEFAULT_QUERY,
};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "ad-analyst",
    version,
    about = "Diagnose advertising performance with a multi-stage reasoning pipeline"
)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(long, default_value = "config/config.yaml")]
    config: PathBuf,

    /// Question to analyse; words are joined with spaces
    query: Vec<String>,
}

fn init_tracing(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}

/// Production client when the API key is set, otherwise an unavailable one
/// so every stage degrades to its fallback.
fn generation_client(config: &AppConfig) -> Arc<dyn GenerationClient> {
    let key = std::env::var(&config.model.api_key_env).unwrap_or_default();
    if key.trim().is_empty() {
        tracing::warn!(
            env = %config.model.api_key_env,
            "API key not set; running with fallback output only"
        );
        return Arc::new(MockClient::unavailable());
    }

    let gemini = GeminiConfig::new(key)
        .with_model(config.model.name.clone())
        .with_base_url(config.model.base_url.clone())
        .with_timeout(Duration::from_secs(config.model.timeout_secs));
    match GeminiClient::new(gemini) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            tracing::warn!(error = %e, "failed to build generation client; running with fallback output only");
            Arc::new(MockClient::unavailable())
        }
    }
}

fn run(cli: Cli) -> i32 {
    let config = match AppConfig::load(&cli.config) {
        Ok(c) => Arc::new(c),
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    init_tracing(&config.logging.level);

    let query = if cli.query.is_empty() {
        DEFAULT_QUERY.to_string()
    } else {
        cli.query.join(" ")
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to start runtime: {}", e);
            return 1;
        }
    };

    let client = generation_client(&config);
    let templates = Arc::new(FileTemplateStore::new(config.prompts.dir.clone()));
    let orchestrator = Orchestrator::new(config.clone(), client, templates);

    println!("Ad Performance Analyst v{}", ad_analyst::VERSION);
    println!("Query: {}\n", query);

    match runtime.block_on(orchestrator.execute(&query)) {
        RunOutcome::Completed(report) => {
            let output = &config.output;
            println!("Analysis complete ({})", report.execution_id);
            println!("  insights:  {}", output.insights_path.display());
            println!("  creatives: {}", output.creatives_path.display());
            println!("  report:    {}", output.report_path.display());
            0
        }
        RunOutcome::Failed { error, .. } => {
            eprintln!("Analysis failed: {}", error);
            1
        }
    }
}

fn main() {
    let cli = Cli::parse();
    std::process::exit(run(cli));
}
