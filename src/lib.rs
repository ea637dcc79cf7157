//! PrismBreak document-to-knowledge-graph RAG core
//!
//! This library provides tools to:
//! - Split extracted document text into overlapping word-window chunks
//! - Extract knowledge triples from chunks via Gemini and deduplicate them
//! - Upsert entities, facts and per-document episodes into Neo4j idempotently
//! - Embed episode summaries and search them by vector similarity
//! - Translate questions into validated read-only Cypher and execute it
//! - Compose short natural-language answers over retrieved rows

pub mod api;
pub mod collab;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod graph;
pub mod integrations;
pub mod kg;
pub mod prompts;
pub mod retrieval;
pub mod timeout;

// Re-export common types
pub use config::Config;
pub use embeddings::Embedder;
pub use error::{Error, Result};
pub use graph::{EpisodeRow, GraphStore};
pub use integrations::GeminiClient;
pub use kg::{Chunker, Fact, IngestPipeline, IngestReport, TripleCandidate};
pub use prompts::{list_prompts, Prompt};
pub use retrieval::{
    AnswerComposer, CypherGuard, QueryExecutor, QuerySynthesizer, SemanticRetriever,
    NO_RESULTS_ANSWER,
};
pub use timeout::with_timeout;
