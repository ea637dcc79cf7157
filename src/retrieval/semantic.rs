//! Vector-similarity retrieval over episode embeddings.

use std::time::Duration;

use tracing::{debug, info};

use crate::embeddings::Embedder;
use crate::graph::{EpisodeRow, GraphStore};
use crate::timeout::with_timeout;
use crate::Result;

/// Runs nearest-neighbor search over episode embeddings and filters the
/// results by similarity threshold.
pub struct SemanticRetriever {
    store: GraphStore,
    embedder: Embedder,
    index_name: String,
    budget: Duration,
}

impl SemanticRetriever {
    pub fn new(store: GraphStore, embedder: Embedder, index_name: &str, budget: Duration) -> Self {
        Self {
            store,
            embedder,
            index_name: index_name.to_string(),
            budget,
        }
    }

    /// Search episodes similar to the query text.
    ///
    /// Returns up to `top_k` rows ordered by descending score, with rows
    /// below `min_score` removed and one row per source file. Zero
    /// survivors is an empty vec, not an error; the caller decides what
    /// the user sees.
    pub async fn search(
        &self,
        query_text: &str,
        top_k: usize,
        min_score: f32,
    ) -> Result<Vec<EpisodeRow>> {
        let embedding = self.embedder.embed(query_text).await?;
        // An empty query embeds to an empty vector; refuse it here rather
        // than letting the index comparison quietly return nothing useful.
        self.embedder.validate_dimension(&embedding)?;

        let rows = with_timeout(
            self.budget,
            "vector search",
            self.store.vector_query(&self.index_name, top_k, &embedding),
        )
        .await?;
        debug!("Vector search returned {} raw rows", rows.len());

        let episodes = filter_episodes(rows, min_score);
        info!(
            "Semantic search kept {} episodes (min_score {})",
            episodes.len(),
            min_score
        );
        Ok(episodes)
    }
}

/// Drop rows under the score threshold and deduplicate by source file,
/// keeping the first (highest-scoring) row per file. Input order, already
/// descending by score, is preserved.
pub fn filter_episodes(rows: Vec<EpisodeRow>, min_score: f32) -> Vec<EpisodeRow> {
    let mut seen_files = std::collections::HashSet::new();
    rows.into_iter()
        .filter(|row| row.score >= min_score)
        .filter(|row| seen_files.insert(row.source_file.clone()))
        .collect()
}
