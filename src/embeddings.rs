//! Embedding generation service using Gemini.

use std::time::Duration;

use tracing::debug;

use crate::integrations::GeminiClient;
use crate::timeout::with_timeout;
use crate::{Error, Result};

/// Service for generating text embeddings under a time budget.
pub struct Embedder {
    client: GeminiClient,
    dimension: usize,
    budget: Duration,
}

impl Embedder {
    pub fn new(client: GeminiClient, dimension: usize, budget: Duration) -> Self {
        Self {
            client,
            dimension,
            budget,
        }
    }

    /// Generate an embedding for a single text.
    ///
    /// Empty input returns an empty vector without calling the service.
    /// A call that exceeds the budget surfaces as [`Error::Timeout`],
    /// distinct from a service failure.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embedding ({} chars)", text.len());
        let vector = with_timeout(self.budget, "embedding", self.client.embed_content(text)).await?;
        self.validate_dimension(&vector)?;
        Ok(vector)
    }

    /// The expected embedding dimension.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Fail explicitly on a dimension mismatch instead of letting similarity
    /// search silently degrade.
    pub fn validate_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(Error::Embedding(format!(
                "embedding dimension mismatch: got {}, expected {}",
                vector.len(),
                self.dimension
            )));
        }
        Ok(())
    }
}
