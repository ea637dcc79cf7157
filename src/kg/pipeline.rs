//! Document ingestion pipeline.
//!
//! One parameterized flow for every document kind: normalize text, describe
//! attached images, summarize, chunk, extract triples per unit,
//! deduplicate, embed the summary, and upsert the episode with its facts.
//! Per-unit failures (a chunk, an image, a fact) are logged and skipped;
//! only backend failures abort the document.

use std::time::Duration;

use base64::Engine;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use super::chunker::{normalize_text, Chunker};
use super::dedup::dedupe;
use super::extractor::{Extraction, FactExtractor, TripleCandidate};
use super::ingestor::{Episode, GraphIngestor};
use crate::api::{ImagePayload, IngestRequest};
use crate::collab::{DocumentSource, ImageAttachment, ObjectStorage};
use crate::config::Config;
use crate::embeddings::Embedder;
use crate::graph::GraphStore;
use crate::integrations::GeminiClient;
use crate::prompts::Prompt;
use crate::timeout::with_timeout;
use crate::Result;

/// What happened to one ingested document.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub episode_id: String,
    /// Text chunks produced.
    pub chunks: usize,
    /// Extraction units processed (chunks + image descriptions).
    pub units: usize,
    /// Candidate triples before deduplication.
    pub candidates: usize,
    /// Facts actually committed to the graph.
    pub facts_ingested: usize,
    /// Units skipped because of malformed output or a failed call.
    pub units_failed: usize,
}

/// Describes document images through a bounded worker pool.
///
/// Results come back in submission order regardless of completion order,
/// and each pool slot waits out a fixed delay after its call as a crude
/// rate limit.
pub struct ImageDescriber {
    client: GeminiClient,
    prompt: String,
    max_workers: usize,
    api_delay: Duration,
    budget: Duration,
}

impl ImageDescriber {
    pub fn new(
        client: GeminiClient,
        max_workers: usize,
        api_delay: Duration,
        budget: Duration,
    ) -> Self {
        Self {
            client,
            prompt: Prompt::ImageDescription.load(),
            max_workers: max_workers.max(1),
            api_delay,
            budget,
        }
    }

    /// Describe all images, skipping the ones that fail.
    pub async fn describe(&self, images: &[ImageAttachment]) -> Vec<String> {
        if images.is_empty() {
            return Vec::new();
        }
        info!(
            "Describing {} images ({} workers)",
            images.len(),
            self.max_workers
        );

        let results: Vec<crate::Result<String>> = stream::iter(images)
            .map(|img| self.describe_one(img))
            .buffered(self.max_workers)
            .collect()
            .await;

        results
            .into_iter()
            .zip(images)
            .filter_map(|(result, img)| match result {
                Ok(description) if !description.trim().is_empty() => {
                    Some(description.trim().to_string())
                }
                Ok(_) => None,
                Err(err) => {
                    warn!("image description failed for {}: {}", img.name, err);
                    None
                }
            })
            .collect()
    }

    async fn describe_one(&self, img: &ImageAttachment) -> crate::Result<String> {
        let result = with_timeout(
            self.budget,
            "image description",
            self.client
                .describe_image(&img.data, &img.mime_type, &self.prompt),
        )
        .await;
        // Hold the pool slot through the delay so calls on one slot stay
        // spaced out.
        tokio::time::sleep(self.api_delay).await;
        result
    }
}

/// End-to-end ingestion: document in, episode and facts in the graph out.
pub struct IngestPipeline {
    client: GeminiClient,
    chunker: Chunker,
    extractor: FactExtractor,
    describer: ImageDescriber,
    embedder: Embedder,
    ingestor: GraphIngestor,
    summary_prompt: String,
    api_delay: Duration,
    call_timeout: Duration,
    max_summary_chars: usize,
    max_tokens: u32,
    temperature: f32,
}

impl IngestPipeline {
    pub fn new(config: &Config, store: GraphStore) -> Result<Self> {
        let client = GeminiClient::new(&config.gemini)?;
        let chunker = Chunker::new(config.chunking.chunk_size, config.chunking.overlap_size)?;
        let extractor = FactExtractor::new(
            client.clone(),
            config.pipeline.max_tokens,
            config.pipeline.temperature,
        );
        let describer = ImageDescriber::new(
            client.clone(),
            config.pipeline.max_workers,
            config.pipeline.api_delay,
            config.pipeline.call_timeout,
        );
        let embedder = Embedder::new(
            client.clone(),
            config.gemini.embedding_dim,
            config.pipeline.call_timeout,
        );
        let ingestor = GraphIngestor::new(store)?;

        Ok(Self {
            client,
            chunker,
            extractor,
            describer,
            embedder,
            ingestor,
            summary_prompt: Prompt::Summarizer.load(),
            api_delay: config.pipeline.api_delay,
            call_timeout: config.pipeline.call_timeout,
            max_summary_chars: config.pipeline.max_summary_chars,
            max_tokens: config.pipeline.max_tokens,
            temperature: config.pipeline.temperature,
        })
    }

    /// Ingest one document from an API request.
    pub async fn ingest_document(&self, request: IngestRequest) -> Result<IngestReport> {
        let images = decode_images(&request.images);
        self.ingest_content(
            request.episode_id,
            &request.source_file,
            &request.user_scope,
            &request.text,
            images,
        )
        .await
    }

    /// Ingest a previously uploaded file: download it from object storage,
    /// run it through the document extractor, then through the pipeline.
    pub async fn ingest_stored_file<S, D>(
        &self,
        storage: &S,
        source: &D,
        file_id: &str,
        file_name: &str,
        user_scope: &str,
    ) -> Result<IngestReport>
    where
        S: ObjectStorage + Sync,
        D: DocumentSource + Sync,
    {
        let bytes = storage.download(file_id).await?;
        let document = source.extract(file_name, &bytes).await?;
        self.ingest_content(None, file_name, user_scope, &document.text, document.images)
            .await
    }

    async fn ingest_content(
        &self,
        episode_id: Option<String>,
        source_file: &str,
        user_scope: &str,
        text: &str,
        images: Vec<ImageAttachment>,
    ) -> Result<IngestReport> {
        info!("Processing document: {}", source_file);
        let text = normalize_text(text);

        let descriptions = self.describer.describe(&images).await;

        let mut combined = text.clone();
        for description in &descriptions {
            if !combined.is_empty() {
                combined.push(' ');
            }
            combined.push_str(description);
        }

        let summary = match self.summarize(&combined).await {
            Ok(summary) => summary,
            Err(err) => {
                warn!("summarization failed, using leading text: {}", err);
                fallback_summary(&combined)
            }
        };

        let chunks = self.chunker.chunk(&text);
        let chunk_count = chunks.len();
        let mut units: Vec<String> = chunks.into_iter().map(|c| c.content).collect();
        units.extend(descriptions);

        let unit_count = units.len();
        let mut candidates: Vec<TripleCandidate> = Vec::new();
        let mut units_failed = 0;

        for (i, unit) in units.iter().enumerate() {
            match with_timeout(
                self.call_timeout,
                "fact extraction",
                self.extractor.extract(unit),
            )
            .await
            {
                Ok(Extraction::Facts(found)) => {
                    debug!("unit {}/{}: {} candidates", i + 1, unit_count, found.len());
                    candidates.extend(found);
                }
                Ok(Extraction::Malformed { reason }) => {
                    warn!("unit {}/{} skipped: {}", i + 1, unit_count, reason);
                    units_failed += 1;
                }
                Err(err) => {
                    warn!("unit {}/{} failed: {}", i + 1, unit_count, err);
                    units_failed += 1;
                }
            }

            if i + 1 < unit_count {
                tokio::time::sleep(self.api_delay).await;
            }
        }

        let candidate_count = candidates.len();
        let facts = dedupe(candidates);

        let embedding = match self.embedder.embed(&summary).await {
            Ok(vector) => vector,
            Err(err) => {
                warn!("embedding failed, storing episode without vector: {}", err);
                Vec::new()
            }
        };

        let episode = Episode {
            id: episode_id.unwrap_or_else(Episode::new_id),
            source_file: source_file.to_string(),
            summary,
            embedding,
            user_scope: user_scope.to_string(),
            ingested_at: Utc::now(),
        };

        let facts_ingested = if facts.is_empty() {
            info!("No facts extracted from {}", source_file);
            0
        } else {
            self.ingestor.ingest(&episode, &facts).await?
        };

        info!(
            "Finished {}: {} chunks, {} candidates, {} facts committed, {} units failed",
            source_file, chunk_count, candidate_count, facts_ingested, units_failed
        );

        Ok(IngestReport {
            episode_id: episode.id,
            chunks: chunk_count,
            units: unit_count,
            candidates: candidate_count,
            facts_ingested,
            units_failed,
        })
    }

    async fn summarize(&self, text: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Ok("No text content found to summarize.".to_string());
        }

        let input: String = if text.len() > self.max_summary_chars {
            warn!("summarization input truncated to {} chars", self.max_summary_chars);
            text.chars().take(self.max_summary_chars).collect()
        } else {
            text.to_string()
        };

        let prompt = format!("{}\n\n{}", self.summary_prompt, input);
        let summary = with_timeout(
            self.call_timeout,
            "summarization",
            self.client
                .generate(&prompt, self.max_tokens, self.temperature),
        )
        .await?;
        Ok(summary.trim().to_string())
    }
}

/// Decode base64 image payloads, skipping the undecodable ones.
pub fn decode_images(payloads: &[ImagePayload]) -> Vec<ImageAttachment> {
    payloads
        .iter()
        .enumerate()
        .filter_map(|(i, payload)| {
            match base64::engine::general_purpose::STANDARD.decode(&payload.data) {
                Ok(data) => Some(ImageAttachment {
                    name: payload
                        .name
                        .clone()
                        .unwrap_or_else(|| format!("image_{}", i + 1)),
                    mime_type: payload.mime_type.clone(),
                    data,
                }),
                Err(err) => {
                    warn!("skipping image {}: invalid base64: {}", i + 1, err);
                    None
                }
            }
        })
        .collect()
}

/// Summary of last resort when the generation call fails: the leading text.
fn fallback_summary(text: &str) -> String {
    text.chars().take(512).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn gemini_for(server: &MockServer) -> GeminiClient {
        let config = crate::config::GeminiConfig {
            api_key: "k".to_string(),
            generation_model: "gemini-2.5-flash-lite".to_string(),
            embedding_model: "text-embedding-004".to_string(),
            embedding_dim: 768,
        };
        GeminiClient::new(&config)
            .unwrap()
            .with_base_url(&server.base_url())
    }

    fn attachment(name: &str, data: &[u8]) -> ImageAttachment {
        ImageAttachment {
            name: name.to_string(),
            mime_type: "image/png".to_string(),
            data: data.to_vec(),
        }
    }

    #[test]
    fn decode_images_skips_invalid_base64() {
        let payloads = vec![
            ImagePayload {
                name: Some("ok.png".to_string()),
                mime_type: "image/png".to_string(),
                data: base64::engine::general_purpose::STANDARD.encode(b"bytes"),
            },
            ImagePayload {
                name: None,
                mime_type: "image/png".to_string(),
                data: "!!! not base64 !!!".to_string(),
            },
        ];

        let decoded = decode_images(&payloads);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].name, "ok.png");
        assert_eq!(decoded[0].data, b"bytes");
    }

    #[test]
    fn decode_images_numbers_unnamed_payloads() {
        let payloads = vec![ImagePayload {
            name: None,
            mime_type: "image/jpeg".to_string(),
            data: base64::engine::general_purpose::STANDARD.encode(b"x"),
        }];
        let decoded = decode_images(&payloads);
        assert_eq!(decoded[0].name, "image_1");
    }

    #[test]
    fn fallback_summary_truncates() {
        let long = "word ".repeat(1000);
        assert_eq!(fallback_summary(&long).chars().count(), 512);
        assert_eq!(fallback_summary("short"), "short");
    }

    #[tokio::test]
    async fn describer_returns_results_in_submission_order() {
        let server = MockServer::start_async().await;
        // The first image's call is slower than the second; order must
        // still follow submission.
        let slow_b64 = base64::engine::general_purpose::STANDARD.encode(b"slow-image");
        let fast_b64 = base64::engine::general_purpose::STANDARD.encode(b"fast-image");

        server
            .mock_async(|when, then| {
                when.method(POST).body_includes(&slow_b64);
                then.status(200)
                    .delay(Duration::from_millis(300))
                    .json_body(json!({"candidates": [{"content": {"role": "model",
                        "parts": [{"text": "a slow diagram"}]}}]}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).body_includes(&fast_b64);
                then.status(200).json_body(json!({"candidates": [{"content": {"role": "model",
                    "parts": [{"text": "a fast chart"}]}}]}));
            })
            .await;

        let describer = ImageDescriber::new(
            gemini_for(&server),
            2,
            Duration::from_millis(0),
            Duration::from_secs(5),
        );
        let descriptions = describer
            .describe(&[
                attachment("slow.png", b"slow-image"),
                attachment("fast.png", b"fast-image"),
            ])
            .await;

        assert_eq!(descriptions, vec!["a slow diagram", "a fast chart"]);
    }

    #[tokio::test]
    async fn describer_skips_failed_images() {
        let server = MockServer::start_async().await;
        let good_b64 = base64::engine::general_purpose::STANDARD.encode(b"good");
        let bad_b64 = base64::engine::general_purpose::STANDARD.encode(b"bad");

        server
            .mock_async(|when, then| {
                when.method(POST).body_includes(&good_b64);
                then.status(200).json_body(json!({"candidates": [{"content": {"role": "model",
                    "parts": [{"text": "a photo of a graph"}]}}]}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).body_includes(&bad_b64);
                then.status(500).body("vision backend down");
            })
            .await;

        let describer = ImageDescriber::new(
            gemini_for(&server),
            2,
            Duration::from_millis(0),
            Duration::from_secs(5),
        );
        let descriptions = describer
            .describe(&[attachment("bad.png", b"bad"), attachment("good.png", b"good")])
            .await;

        assert_eq!(descriptions, vec!["a photo of a graph"]);
    }

    #[tokio::test]
    async fn describer_empty_input_makes_no_calls() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200);
            })
            .await;

        let describer = ImageDescriber::new(
            gemini_for(&server),
            2,
            Duration::from_millis(0),
            Duration::from_secs(5),
        );
        assert!(describer.describe(&[]).await.is_empty());
        mock.assert_hits_async(0).await;
    }

    #[tokio::test]
    #[ignore] // Requires Neo4j and a Gemini API key
    async fn ingests_a_document_end_to_end() {
        dotenvy::dotenv().ok();
        let config = crate::Config::load();
        let store = GraphStore::connect(&config.neo4j).await.unwrap();
        store.init_schema().await.unwrap();
        let pipeline = IngestPipeline::new(&config, store).unwrap();

        let report = pipeline
            .ingest_document(crate::api::IngestRequest {
                episode_id: None,
                source_file: "pipeline_e2e.txt".to_string(),
                user_scope: "test_user_123".to_string(),
                text: "Alice works at Acme. Acme is located in Berlin.".to_string(),
                images: Vec::new(),
            })
            .await
            .unwrap();

        assert_eq!(report.chunks, 1);
        assert!(report.facts_ingested > 0);
    }
}
