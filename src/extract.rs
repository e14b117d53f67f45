//! Structured extraction from free-form generation output
//!
//! Generation services are not guaranteed to return clean JSON. The extractor
//! runs an ordered list of strategies and yields the first record recovered:
//!
//! 1. `DirectParse`: the whole response is a JSON object
//! 2. `LabeledFence`: the first ```` ```json ```` fenced block
//! 3. `AnyFence`: the first fenced block of any label
//!
//! A fenced block that is found but does not hold a valid JSON object is a
//! hard failure. Later strategies are not consulted, so an ambiguous response
//! never turns into a best-effort guess.

use serde_json::Value;

/// Maximum number of characters of the raw response kept for diagnostics.
pub const PREVIEW_CHARS: usize = 200;

/// No structured record could be recovered from a response.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("no structured record found in response: {preview}")]
pub struct ExtractionError {
    /// Prefix of the raw response, at most `PREVIEW_CHARS` characters
    pub preview: String,
    /// Why the last applicable strategy rejected the text, if one applied
    pub reason: Option<String>,
}

impl ExtractionError {
    fn for_text(text: &str, reason: Option<String>) -> Self {
        Self {
            preview: preview(text),
            reason,
        }
    }
}

/// Truncate `text` to `PREVIEW_CHARS` characters on a char boundary.
pub fn preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Outcome of a single strategy.
#[derive(Debug, Clone, PartialEq)]
pub enum Attempt {
    /// A JSON object was recovered
    Parsed(Value),
    /// The strategy applied to this text but its block was not a JSON object
    Rejected(String),
    /// The strategy does not apply (e.g. no fenced block present)
    Skipped,
}

/// One way of recovering a structured record from text.
pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn attempt(&self, text: &str) -> Attempt;
}

/// The response is itself a JSON object.
pub struct DirectParse;

impl ExtractionStrategy for DirectParse {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn attempt(&self, text: &str) -> Attempt {
        match serde_json::from_str::<Value>(text.trim()) {
            Ok(v) if v.is_object() => Attempt::Parsed(v),
            // Direct parse failing is expected; fall through to fences.
            _ => Attempt::Skipped,
        }
    }
}

/// The first fenced block labeled `json`.
pub struct LabeledFence;

impl ExtractionStrategy for LabeledFence {
    fn name(&self) -> &'static str {
        "labeled-fence"
    }

    fn attempt(&self, text: &str) -> Attempt {
        fenced_blocks(text)
            .into_iter()
            .find(|b| b.label.eq_ignore_ascii_case("json"))
            .map(|b| parse_block(b.body))
            .unwrap_or(Attempt::Skipped)
    }
}

/// The first fenced block, whatever its label.
pub struct AnyFence;

impl ExtractionStrategy for AnyFence {
    fn name(&self) -> &'static str {
        "any-fence"
    }

    fn attempt(&self, text: &str) -> Attempt {
        fenced_blocks(text)
            .into_iter()
            .next()
            .map(|b| parse_block(b.body))
            .unwrap_or(Attempt::Skipped)
    }
}

fn parse_block(body: &str) -> Attempt {
    match serde_json::from_str::<Value>(body.trim()) {
        Ok(v) if v.is_object() => Attempt::Parsed(v),
        Ok(_) => Attempt::Rejected("fenced block is not a JSON object".to_string()),
        Err(e) => Attempt::Rejected(format!("fenced block is not valid JSON: {}", e)),
    }
}

/// A ``` fenced block: its info-string label and interior.
#[derive(Debug, Clone, PartialEq)]
struct FencedBlock<'a> {
    label: &'a str,
    body: &'a str,
}

/// Scan `text` for closed ``` fences, in order of appearance.
///
/// The label is the run of identifier characters after the opening fence and
/// any spaces or tabs, so ```` ```json\n{..}\n``` ```` and ```` ```json {..}``` ```` are
/// recognised. An unclosed fence ends the scan.
fn fenced_blocks(text: &str) -> Vec<FencedBlock<'_>> {
    const FENCE: &str = "```";
    let mut blocks = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find(FENCE) {
        let after = &rest[open + FENCE.len()..];
        let Some(close) = after.find(FENCE) else {
            break;
        };
        let inner = after[..close].trim_start_matches([' ', '\t']);
        let label_len = inner
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '+'))
            .unwrap_or(inner.len());
        blocks.push(FencedBlock {
            label: &inner[..label_len],
            body: &inner[label_len..],
        });
        rest = &after[close + FENCE.len()..];
    }

    blocks
}

/// Ordered list of strategies; the first `Parsed` or `Rejected` wins.
pub struct StructuredExtractor {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl Default for StructuredExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl StructuredExtractor {
    /// Direct parse, then labeled fence, then any fence.
    pub fn new() -> Self {
        Self {
            strategies: vec![
                Box::new(DirectParse),
                Box::new(LabeledFence),
                Box::new(AnyFence),
            ],
        }
    }

    /// Build an extractor with a custom strategy order.
    pub fn with_strategies(strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Recover a JSON object from `raw_text`.
    pub fn extract(&self, raw_text: &str) -> Result<Value, ExtractionError> {
        for strategy in &self.strategies {
            match strategy.attempt(raw_text) {
                Attempt::Parsed(value) => return Ok(value),
                Attempt::Rejected(reason) => {
                    tracing::debug!(strategy = strategy.name(), %reason, "extraction rejected");
                    return Err(ExtractionError::for_text(raw_text, Some(reason)));
                }
                Attempt::Skipped => continue,
            }
        }
        Err(ExtractionError::for_text(raw_text, None))
    }
}

/// Extract with the default strategy order.
pub fn extract(raw_text: &str) -> Result<Value, ExtractionError> {
    StructuredExtractor::new().extract(raw_text)
}
