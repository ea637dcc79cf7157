//! Request/response shapes exposed to the HTTP layer.
//!
//! Transport scaffolding is out of scope; these are the serde DTOs the
//! endpoints exchange with the pipeline and retrievers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::graph::EpisodeRow;

fn default_user_scope() -> String {
    "public".to_string()
}

fn default_top_k() -> usize {
    5
}

fn default_min_score() -> f32 {
    0.5
}

/// An image uploaded alongside document text, base64-encoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagePayload {
    #[serde(default)]
    pub name: Option<String>,
    pub mime_type: String,
    /// Base64-encoded image bytes.
    pub data: String,
}

/// Ingestion request for one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestRequest {
    /// Provided on re-ingestion; a fresh id is generated otherwise.
    #[serde(default)]
    pub episode_id: Option<String>,
    pub source_file: String,
    #[serde(default = "default_user_scope")]
    pub user_scope: String,
    pub text: String,
    #[serde(default)]
    pub images: Vec<ImagePayload>,
}

/// Ingestion response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    pub facts_ingested: usize,
}

/// Semantic search request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_min_score")]
    pub min_score: f32,
}

/// One matching episode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeHit {
    pub source_file: String,
    pub episode_id: String,
    pub summary: String,
    pub user_scope: String,
    pub score: f32,
}

impl From<EpisodeRow> for EpisodeHit {
    fn from(row: EpisodeRow) -> Self {
        Self {
            source_file: row.source_file,
            episode_id: row.episode_id,
            summary: row.summary,
            user_scope: row.user_scope,
            score: row.score,
        }
    }
}

/// Semantic search response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub episodes: Vec<EpisodeHit>,
}

impl ChatResponse {
    /// Response for a search with no surviving episodes: a single
    /// placeholder row telling the user to rephrase.
    pub fn fallback() -> Self {
        Self {
            episodes: vec![EpisodeHit {
                source_file: "N/A".to_string(),
                episode_id: "N/A".to_string(),
                summary: "No matching episodes found. Try rephrasing your query.".to_string(),
                user_scope: "N/A".to_string(),
                score: 0.0,
            }],
        }
    }

    pub fn from_rows(rows: Vec<EpisodeRow>) -> Self {
        if rows.is_empty() {
            return Self::fallback();
        }
        Self {
            episodes: rows.into_iter().map(EpisodeHit::from).collect(),
        }
    }
}

/// Generated-query answer: the query that ran, its parameters, the rows it
/// returned, and the composed answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryAnswer {
    pub query: String,
    pub params: Map<String, JsonValue>,
    pub rows: Vec<JsonValue>,
    pub answer: String,
}
