//! LLM-based knowledge triple extraction.
//!
//! Sends one text unit (a chunk or an image description) to Gemini with the
//! triple-extraction prompt and parses the JSON array it returns. Model
//! output is untrusted: fences are stripped, malformed elements are skipped
//! one by one, and a response that is not a JSON array at all is reported as
//! [`Extraction::Malformed`] rather than an `Err`, so callers can skip the
//! unit and keep going.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::integrations::GeminiClient;
use crate::prompts::Prompt;
use crate::{Error, Result};

/// A candidate relationship as emitted by the model, not yet canonicalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripleCandidate {
    pub start: String,
    pub relation: String,
    pub end: String,
}

/// Outcome of extracting one unit.
///
/// Transport and service failures stay in the `Err` channel; this type only
/// distinguishes a usable fact list from output we could not parse.
#[derive(Debug, Clone)]
pub enum Extraction {
    /// Parsed candidate facts (possibly empty).
    Facts(Vec<TripleCandidate>),
    /// The model returned something that is not a triple array.
    Malformed { reason: String },
}

/// Extracts candidate triples from text units.
pub struct FactExtractor {
    client: GeminiClient,
    system_prompt: String,
    max_tokens: u32,
    temperature: f32,
}

impl FactExtractor {
    pub fn new(client: GeminiClient, max_tokens: u32, temperature: f32) -> Self {
        Self {
            client,
            system_prompt: Prompt::TripleExtraction.load(),
            max_tokens,
            temperature,
        }
    }

    /// Extract candidate triples from one text unit.
    pub async fn extract(&self, unit: &str) -> Result<Extraction> {
        let user = format!("Text to analyze:\n{}", unit);
        let raw = self
            .client
            .generate_json(&self.system_prompt, &user, self.max_tokens, self.temperature)
            .await?;

        match parse_triples(&raw) {
            Ok(candidates) => Ok(Extraction::Facts(candidates)),
            Err(Error::Parse(reason)) => {
                warn!("extraction output unusable: {}", reason);
                Ok(Extraction::Malformed { reason })
            }
            Err(other) => Err(other),
        }
    }
}

/// Parse model output into triple candidates.
///
/// The output must be a JSON array once optional code fences are removed.
/// Array elements that are not objects with the three string keys are
/// dropped individually; only a non-array payload fails the whole unit.
pub fn parse_triples(raw: &str) -> Result<Vec<TripleCandidate>> {
    let cleaned = strip_code_fences(raw);
    if cleaned.is_empty() {
        return Err(Error::Parse("empty extraction output".to_string()));
    }

    let value: serde_json::Value = serde_json::from_str(cleaned)
        .map_err(|e| Error::Parse(format!("not valid JSON: {}", e)))?;

    let items = value
        .as_array()
        .ok_or_else(|| Error::Parse("expected a JSON array of triples".to_string()))?;

    let mut candidates = Vec::with_capacity(items.len());
    for item in items {
        match serde_json::from_value::<TripleCandidate>(item.clone()) {
            Ok(candidate) => candidates.push(candidate),
            Err(_) => warn!("skipping malformed triple: {}", item),
        }
    }

    Ok(candidates)
}

/// Remove a wrapping Markdown code fence (```json ... ```), if present.
pub(crate) fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // The fence line may carry a language tag ("json").
    let rest = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
