//! Canonicalization and deduplication of extracted facts.

use std::collections::HashSet;

use super::extractor::TripleCandidate;

/// A deduplicated fact ready for graph storage.
///
/// Holds exactly the three relationship fields plus a stable sequence id;
/// episode linkage is attached at ingest time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fact {
    /// Sequential identifier within the episode, starting at 1.
    pub id: usize,
    pub start: String,
    pub relation: String,
    pub end: String,
}

/// Canonical deduplication key: each field lowercased and trimmed.
///
/// Returns `None` when any field is empty after trimming; such candidates
/// carry no usable relationship and are discarded.
pub fn canonical_key(candidate: &TripleCandidate) -> Option<(String, String, String)> {
    let start = candidate.start.trim().to_lowercase();
    let relation = candidate.relation.trim().to_lowercase();
    let end = candidate.end.trim().to_lowercase();

    if start.is_empty() || relation.is_empty() || end.is_empty() {
        return None;
    }
    Some((start, relation, end))
}

/// Deduplicate candidates for one episode.
///
/// Keeps the first occurrence per canonical key in input order and numbers
/// the survivors from 1. The surviving fact keeps its original surface form;
/// only the key is canonicalized.
pub fn dedupe(candidates: Vec<TripleCandidate>) -> Vec<Fact> {
    let mut seen = HashSet::new();
    let mut facts = Vec::new();

    for candidate in candidates {
        let Some(key) = canonical_key(&candidate) else {
            continue;
        };
        if seen.insert(key) {
            facts.push(Fact {
                id: facts.len() + 1,
                start: candidate.start.trim().to_string(),
                relation: candidate.relation.trim().to_string(),
                end: candidate.end.trim().to_string(),
            });
        }
    }

    facts
}
