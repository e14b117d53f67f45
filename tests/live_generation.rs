//! Live generation service checks
//!
//! Requires `GOOGLE_API_KEY`. Run with:
//! `cargo test --test live_generation --features real_llm -- --nocapture`

#![cfg(feature = "real_llm")]

mod common;

use ad_analyst::{
    extract, GeminiClient, GeminiConfig, GenerationClient, Orchestrator, SamplingParams,
    StageStatus, StaticTemplateStore,
};
use common::Workspace;
use std::sync::Arc;

fn live_client() -> GeminiClient {
    let key = std::env::var("GOOGLE_API_KEY").expect("GOOGLE_API_KEY must be set");
    GeminiClient::new(GeminiConfig::new(key)).expect("client builds")
}

#[tokio::test]
async fn live_json_round_trip() {
    let client = live_client();
    assert!(client.is_available().await);

    let raw = client
        .generate(
            "Return a JSON object with a single key \"answer\" whose value is 42.",
            &SamplingParams::new(0.0, 256),
        )
        .await
        .expect("generation succeeds");
    println!("raw response: {raw}");

    let record = extract(&raw).expect("response contains a JSON object");
    assert_eq!(record["answer"], 42);
}

#[tokio::test]
async fn live_pipeline_run() {
    let ws = Workspace::new();
    let outcome = Orchestrator::new(
        Arc::new(ws.config.clone()),
        Arc::new(live_client()),
        Arc::new(StaticTemplateStore::builtin()),
    )
    .execute("Why did ROAS decline and which campaigns need new creatives?")
    .await;

    let report = outcome.report().expect("run completes");
    for entry in &report.stages {
        println!("{}: {}", entry.stage, entry.result.status());
        assert_ne!(entry.result.status(), StageStatus::Error);
    }
}
