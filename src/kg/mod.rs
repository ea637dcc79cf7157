//! Knowledge graph construction.
//!
//! The ingestion side of the system: chunking, LLM fact extraction,
//! canonical deduplication, and idempotent upsert into Neo4j, orchestrated
//! by [`pipeline::IngestPipeline`].

pub mod chunker;
pub mod dedup;
pub mod extractor;
pub mod ingestor;
pub mod pipeline;

pub use chunker::{normalize_text, Chunk, Chunker};
pub use dedup::{canonical_key, dedupe, Fact};
pub use extractor::{parse_triples, Extraction, FactExtractor, TripleCandidate};
pub use ingestor::{Episode, GraphIngestor};
pub use pipeline::{IngestPipeline, IngestReport};
