//! Natural-language answer synthesis over retrieved rows.

use serde_json::{json, Value as JsonValue};
use tracing::debug;

use crate::graph::EpisodeRow;
use crate::integrations::GeminiClient;
use crate::prompts::Prompt;
use crate::Result;

/// Fixed answer for the empty-result path. Returned verbatim, never
/// generated, so an empty graph can never produce an invented answer.
pub const NO_RESULTS_ANSWER: &str =
    "No matching information was found in the knowledge graph. Try rephrasing your question.";

/// Produces a short answer from the question and the retrieved rows.
pub struct AnswerComposer {
    client: GeminiClient,
    system_prompt: String,
    max_rows: usize,
    max_tokens: u32,
    temperature: f32,
}

impl AnswerComposer {
    pub fn new(client: GeminiClient, max_rows: usize, max_tokens: u32, temperature: f32) -> Self {
        Self {
            client,
            system_prompt: Prompt::AnswerSynthesis.load(),
            max_rows,
            max_tokens,
            temperature,
        }
    }

    /// Compose an answer from raw query rows.
    ///
    /// Empty rows short-circuit to [`NO_RESULTS_ANSWER`] without a
    /// generation call.
    pub async fn compose(&self, question: &str, rows: &[JsonValue]) -> Result<String> {
        if rows.is_empty() {
            return Ok(NO_RESULTS_ANSWER.to_string());
        }

        let prompt = format!(
            "{}\n\nQuestion: {}\nData from graph:\n{}\n\nAnswer in simple natural language:",
            self.system_prompt,
            question,
            build_context(rows, self.max_rows)
        );

        debug!("Composing answer over {} rows", rows.len().min(self.max_rows));
        let answer = self
            .client
            .generate(&prompt, self.max_tokens, self.temperature)
            .await?;
        Ok(answer.trim().to_string())
    }

    /// Compose an answer from semantic-search episodes.
    pub async fn compose_from_episodes(
        &self,
        question: &str,
        episodes: &[EpisodeRow],
    ) -> Result<String> {
        let rows: Vec<JsonValue> = episodes
            .iter()
            .map(|ep| {
                json!({
                    "source_file": ep.source_file,
                    "episode_id": ep.episode_id,
                    "summary": ep.summary,
                    "score": ep.score,
                })
            })
            .collect();
        self.compose(question, &rows).await
    }
}

/// Serialize the first `max_rows` rows, one JSON object per line.
fn build_context(rows: &[JsonValue], max_rows: usize) -> String {
    rows.iter()
        .take(max_rows)
        .map(|row| row.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
