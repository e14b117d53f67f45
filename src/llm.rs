//! Generation service client
//!
//! Defines the client trait and response types for calling a text-generation
//! backend. Two implementations:
//! - `GeminiClient`: HTTP client for the Generative Language API (production)
//! - `MockClient`: returns preconfigured responses (testing)
//!
//! The pipeline treats a call as atomic and blocking; any failure is reported
//! as a `GenerationError` and converted into a stage fallback by the caller.

use async_trait::async_trait;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Sampling parameters for a single generation call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl SamplingParams {
    pub fn new(temperature: f32, max_output_tokens: u32) -> Self {
        Self {
            temperature,
            max_output_tokens,
        }
    }
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self::new(0.7, 2048)
    }
}

/// Errors from generation client operations.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("generation service not available: {0}")]
    Unavailable(String),
    #[error("generation request failed: {0}")]
    Request(String),
    #[error("generation service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("generation service returned no text")]
    EmptyResponse,
    #[error("response parse error: {0}")]
    Parse(String),
}

/// Client trait for the text-generation backend.
///
/// Abstracts over transport (HTTP, mock) so reasoning stages
/// don't depend on how the service is reached.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Check if the service is reachable/configured.
    async fn is_available(&self) -> bool;

    /// Generate a completion for `prompt`.
    async fn generate(
        &self,
        prompt: &str,
        params: &SamplingParams,
    ) -> Result<String, GenerationError>;
}

/// Mock client for testing: returns preconfigured responses.
///
/// Scripted responses are consumed in order; once the script is exhausted
/// the default response (if any) is returned for every call.
pub struct MockClient {
    available: bool,
    script: Mutex<VecDeque<Result<String, String>>>,
    default_response: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl MockClient {
    /// Create a mock client that reports as available.
    pub fn available() -> Self {
        Self {
            available: true,
            script: Mutex::new(VecDeque::new()),
            default_response: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock client that reports as unavailable.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::available()
        }
    }

    /// Create a client whose every call fails.
    pub fn failing() -> Self {
        Self::available()
    }

    /// Return `response` whenever the script is empty.
    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.default_response = Some(response.into());
        self
    }

    /// Queue a successful response for the next unscripted call.
    pub fn then_respond(self, response: impl Into<String>) -> Self {
        self.push(Ok(response.into()));
        self
    }

    /// Queue a failure for the next unscripted call.
    pub fn then_fail(self, message: impl Into<String>) -> Self {
        self.push(Err(message.into()));
        self
    }

    fn push(&self, entry: Result<String, String>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(entry);
        }
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.prompts().len()
    }
}

#[async_trait]
impl GenerationClient for MockClient {
    async fn is_available(&self) -> bool {
        self.available
    }

    async fn generate(
        &self,
        prompt: &str,
        _params: &SamplingParams,
    ) -> Result<String, GenerationError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        if !self.available {
            return Err(GenerationError::Unavailable(
                "mock client configured as unavailable".to_string(),
            ));
        }

        let scripted = self.script.lock().ok().and_then(|mut s| s.pop_front());
        match scripted {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(GenerationError::Request(message)),
            None => self
                .default_response
                .clone()
                .ok_or_else(|| GenerationError::Request("mock failure: no response configured".to_string())),
        }
    }
}

/// Connection settings for `GeminiClient`.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    api_key: Secret<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Secret::new(api_key.into()),
            model: "gemini-2.0-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout: Duration::from_secs(120),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Generative Language API client.
pub struct GeminiClient {
    config: GeminiConfig,
    client: reqwest::Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GenerationError::Request(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl GenerationClient for GeminiClient {
    async fn is_available(&self) -> bool {
        !self.config.api_key.expose_secret().is_empty()
    }

    async fn generate(
        &self,
        prompt: &str,
        params: &SamplingParams,
    ) -> Result<String, GenerationError> {
        let body = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: params.temperature,
                max_output_tokens: params.max_output_tokens,
            },
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.config.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Request(format!(
                        "timed out after {}s",
                        self.config.timeout.as_secs()
                    ))
                } else if e.is_connect() {
                    GenerationError::Unavailable(e.to_string())
                } else {
                    GenerationError::Request(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Parse(e.to_string()))?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(text)
    }
}
