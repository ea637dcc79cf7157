//! Integration tests for the prismbreak library
//!
//! These tests verify the public API and module interactions.

use prismbreak::api::{ChatRequest, ChatResponse, IngestRequest};
use prismbreak::kg::{dedupe, parse_triples, Chunker, TripleCandidate};
use prismbreak::retrieval::semantic::filter_episodes;
use prismbreak::{list_prompts, Config, CypherGuard, Error, EpisodeRow};

// ============================================================================
// Config Tests
// ============================================================================

#[test]
fn test_config_load_or_defaults() {
    let config = Config::load();
    assert!(config.chunking.chunk_size > config.chunking.overlap_size);
    assert!(config.gemini.embedding_dim > 0);
    assert!(!config.retrieval.vector_index.is_empty());
}

// ============================================================================
// Chunker Tests
// ============================================================================

#[test]
fn test_chunk_count_and_coverage_for_default_parameters() {
    let chunker = Chunker::new(250, 50).unwrap();

    // 1000 words, step 200: ceil((1000 - 250) / 200) + 1 = 5 chunks
    let words: Vec<String> = (0..1000).map(|i| format!("w{}", i)).collect();
    let chunks = chunker.chunk(&words.join(" "));
    assert_eq!(chunks.len(), 5);

    // Every word index is covered by at least one chunk.
    let mut covered = vec![false; 1000];
    for chunk in &chunks {
        for flag in covered[chunk.start_pos..chunk.end_pos].iter_mut() {
            *flag = true;
        }
    }
    assert!(covered.into_iter().all(|flag| flag));

    // Word count at or under the chunk size produces exactly one chunk.
    let short: Vec<String> = (0..250).map(|i| format!("w{}", i)).collect();
    assert_eq!(chunker.chunk(&short.join(" ")).len(), 1);
}

#[test]
fn test_chunker_rejects_degenerate_parameters() {
    assert!(Chunker::new(0, 0).is_err());
    assert!(Chunker::new(50, 50).is_err());
    assert!(Chunker::new(50, 200).is_err());
}

// ============================================================================
// Deduplication Tests
// ============================================================================

#[test]
fn test_case_insensitive_deduplication() {
    let candidates = vec![
        TripleCandidate {
            start: "Alice".into(),
            relation: "works_at".into(),
            end: "Acme".into(),
        },
        TripleCandidate {
            start: " alice ".into(),
            relation: "WORKS_AT".into(),
            end: "acme".into(),
        },
    ];

    let facts = dedupe(candidates);
    assert_eq!(facts.len(), 1);
    assert_eq!(facts[0].id, 1);
}

#[test]
fn test_extraction_output_feeds_deduplication() {
    let raw = r#"[
        {"start": "Alan Turing", "relation": "PROPOSED", "end": "universal machine"},
        {"start": "alan turing", "relation": "proposed", "end": "Universal Machine"},
        {"start": "", "relation": "PROPOSED_IN", "end": "1936"}
    ]"#;

    let candidates = parse_triples(raw).unwrap();
    assert_eq!(candidates.len(), 3);

    let facts = dedupe(candidates);
    assert_eq!(facts.len(), 1);
    assert_eq!(facts[0].start, "Alan Turing");
}

// ============================================================================
// Retrieval Tests
// ============================================================================

#[test]
fn test_threshold_filtering_keeps_only_passing_rows() {
    let rows = vec![
        EpisodeRow {
            source_file: "high.pdf".into(),
            episode_id: "ep_high".into(),
            summary: "relevant".into(),
            user_scope: "u".into(),
            score: 0.91,
        },
        EpisodeRow {
            source_file: "low.pdf".into(),
            episode_id: "ep_low".into(),
            summary: "irrelevant".into(),
            user_scope: "u".into(),
            score: 0.42,
        },
    ];

    let kept = filter_episodes(rows, 0.5);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].episode_id, "ep_high");
}

#[test]
fn test_empty_search_result_maps_to_fallback_response() {
    let response = ChatResponse::from_rows(Vec::new());
    assert_eq!(response.episodes.len(), 1);
    assert_eq!(response.episodes[0].source_file, "N/A");
    assert!(response.episodes[0].summary.contains("rephrasing"));
}

// ============================================================================
// Safety Tests
// ============================================================================

#[test]
fn test_mutating_queries_are_rejected_before_execution() {
    let attempts = [
        "MATCH (n) RETURN n LIMIT $row_limit; DELETE n",
        "match (n) delete n return count(n) limit $row_limit",
        "MATCH (a)-[r]->(b) WITH r MERGE (a)-[:COPY]->(b) RETURN a LIMIT $row_limit",
        "CREATE (n:Entity {name: $name}) RETURN n LIMIT $row_limit",
        "MATCH (n) SET n.name = $name RETURN n LIMIT $row_limit",
        "DROP CONSTRAINT entity_identity",
    ];

    for query in attempts {
        let err = CypherGuard::validate(query).unwrap_err();
        assert!(
            matches!(err, Error::SafetyViolation(_)),
            "expected rejection for {}",
            query
        );
    }
}

#[test]
fn test_read_only_query_passes_the_guard() {
    let query = "MATCH (a:Entity {name: $name, user_scope: $scope})-[r]->(b) \
                 RETURN a.name AS start, type(r) AS relation, b.name AS end \
                 ORDER BY b.name LIMIT $row_limit";
    assert!(CypherGuard::validate(query).is_ok());
}

// ============================================================================
// API Shape Tests
// ============================================================================

#[test]
fn test_request_shapes_deserialize_with_defaults() {
    let ingest: IngestRequest = serde_json::from_str(
        r#"{"source_file": "report.pdf", "text": "Quarterly numbers improved."}"#,
    )
    .unwrap();
    assert_eq!(ingest.user_scope, "public");

    let chat: ChatRequest = serde_json::from_str(r#"{"query": "what improved?"}"#).unwrap();
    assert_eq!(chat.top_k, 5);
    assert!((chat.min_score - 0.5).abs() < f32::EPSILON);
}

// ============================================================================
// Prompt Tests
// ============================================================================

#[test]
fn test_every_prompt_loads_text() {
    for prompt in list_prompts() {
        assert!(!prompt.load().trim().is_empty());
    }
}
