//! Question answering over the knowledge graph.
//!
//! Two paths share the answer composer:
//! - semantic: embed the question and search the episode vector index
//! - cypher: generate a restricted read-only query, validate, execute

pub mod answer;
pub mod cypher;
pub mod semantic;

pub use answer::{AnswerComposer, NO_RESULTS_ANSWER};
pub use cypher::{CypherGuard, GeneratedQuery, QueryExecutor, QuerySynthesizer};
pub use semantic::SemanticRetriever;
