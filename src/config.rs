//! Configuration for the knowledge graph pipeline
//!
//! Loads configuration from a config.yml file. Values that look like
//! `${VAR_NAME}` are resolved from the environment, and well-known
//! environment variables act as fallbacks, so credentials never need to
//! live in the file itself. The resulting `Config` is an explicit value
//! passed into each component constructor; nothing here is global.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::{Error, Result};

/// Neo4j connection settings.
#[derive(Debug, Clone)]
pub struct Neo4jConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
}

/// Gemini API settings.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub generation_model: String,
    pub embedding_model: String,
    /// Expected embedding dimensionality (validated on every vector).
    pub embedding_dim: usize,
}

/// Text chunking parameters (word counts).
#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub overlap_size: usize,
}

/// Retrieval and query-generation parameters.
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub min_score: f32,
    /// Hard row cap for generated queries.
    pub row_limit: usize,
    /// Name of the episode vector index in Neo4j.
    pub vector_index: String,
    /// How many retrieved rows the answer composer may see.
    pub answer_max_rows: usize,
}

/// Ingestion pipeline parameters.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Concurrent image-description calls.
    pub max_workers: usize,
    /// Minimum delay between external calls on one pool slot.
    pub api_delay: Duration,
    /// Budget for any single external call.
    pub call_timeout: Duration,
    /// Truncation guard for the summarization input.
    pub max_summary_chars: usize,
    /// Max tokens for generation calls.
    pub max_tokens: u32,
    /// Temperature for extraction and query generation.
    pub temperature: f32,
    /// Temperature for answer synthesis (kept low to avoid invention).
    pub answer_temperature: f32,
}

/// Main configuration struct.
#[derive(Debug, Clone)]
pub struct Config {
    pub neo4j: Neo4jConfig,
    pub gemini: GeminiConfig,
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    pub pipeline: PipelineConfig,
}

/// YAML config structures
#[derive(Debug, Default, Deserialize)]
struct YamlConfig {
    neo4j: Option<YamlNeo4j>,
    gemini: Option<YamlGemini>,
    chunking: Option<YamlChunking>,
    retrieval: Option<YamlRetrieval>,
    pipeline: Option<YamlPipeline>,
}

#[derive(Debug, Default, Deserialize)]
struct YamlNeo4j {
    uri: Option<String>,
    user: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct YamlGemini {
    api_key: Option<String>,
    generation_model: Option<String>,
    embedding_model: Option<String>,
    embedding_dim: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct YamlChunking {
    chunk_size: Option<usize>,
    overlap_size: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct YamlRetrieval {
    top_k: Option<usize>,
    min_score: Option<f32>,
    row_limit: Option<usize>,
    vector_index: Option<String>,
    answer_max_rows: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct YamlPipeline {
    max_workers: Option<usize>,
    api_delay_secs: Option<u64>,
    call_timeout_secs: Option<u64>,
    max_summary_chars: Option<usize>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    answer_temperature: Option<f32>,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_yaml(YamlConfig::default())
    }
}

impl Config {
    /// Load configuration from config.yml or use defaults.
    /// Environment variables take precedence over config.yml values.
    pub fn load() -> Self {
        Self::load_from_file("config.yml")
            .or_else(|_| Self::load_from_file("../config.yml"))
            .unwrap_or_default()
    }

    /// Load configuration from a specific YAML file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let yaml: YamlConfig = serde_yaml::from_str(&content)
            .map_err(|e| Error::Serialization(format!("invalid config.yml: {}", e)))?;
        Ok(Self::from_yaml(yaml))
    }

    fn from_yaml(yaml: YamlConfig) -> Self {
        let neo4j = yaml.neo4j.unwrap_or_default();
        let gemini = yaml.gemini.unwrap_or_default();
        let chunking = yaml.chunking.unwrap_or_default();
        let retrieval = yaml.retrieval.unwrap_or_default();
        let pipeline = yaml.pipeline.unwrap_or_default();

        Self {
            neo4j: Neo4jConfig {
                uri: resolve_env_string(neo4j.uri, "NEO4J_URI")
                    .unwrap_or_else(|| "bolt://localhost:7687".to_string()),
                user: resolve_env_string(neo4j.user, "NEO4J_USER")
                    .unwrap_or_else(|| "neo4j".to_string()),
                password: resolve_env_string(neo4j.password, "NEO4J_PASSWORD")
                    .unwrap_or_default(),
            },
            gemini: GeminiConfig {
                api_key: resolve_env_string(gemini.api_key, "GEMINI_API_KEY")
                    .or_else(|| std::env::var("GOOGLE_API_KEY").ok())
                    .unwrap_or_default(),
                generation_model: gemini
                    .generation_model
                    .unwrap_or_else(|| "gemini-2.5-flash-lite".to_string()),
                embedding_model: gemini
                    .embedding_model
                    .unwrap_or_else(|| "text-embedding-004".to_string()),
                embedding_dim: gemini.embedding_dim.unwrap_or(768),
            },
            chunking: ChunkingConfig {
                chunk_size: chunking.chunk_size.unwrap_or(250),
                overlap_size: chunking.overlap_size.unwrap_or(50),
            },
            retrieval: RetrievalConfig {
                top_k: retrieval.top_k.unwrap_or(5),
                min_score: retrieval.min_score.unwrap_or(0.5),
                row_limit: retrieval.row_limit.unwrap_or(25),
                vector_index: retrieval
                    .vector_index
                    .unwrap_or_else(|| "episode_index".to_string()),
                answer_max_rows: retrieval.answer_max_rows.unwrap_or(10),
            },
            pipeline: PipelineConfig {
                max_workers: pipeline.max_workers.unwrap_or(5).max(1),
                api_delay: Duration::from_secs(pipeline.api_delay_secs.unwrap_or(3)),
                call_timeout: Duration::from_secs(pipeline.call_timeout_secs.unwrap_or(15)),
                max_summary_chars: pipeline.max_summary_chars.unwrap_or(200_000),
                max_tokens: pipeline.max_tokens.unwrap_or(4096),
                temperature: pipeline.temperature.unwrap_or(0.2),
                answer_temperature: pipeline.answer_temperature.unwrap_or(0.1),
            },
        }
    }
}

/// Resolve a value: a `${VAR}` reference reads the environment, then the
/// explicit `env_key` takes precedence, then the literal YAML value.
/// An unresolvable `${VAR}` reference never leaks through as a literal.
fn resolve_env_string(value: Option<String>, env_key: &str) -> Option<String> {
    if let Some(ref v) = value {
        if v.starts_with("${") && v.ends_with('}') {
            let var_name = &v[2..v.len() - 1];
            if let Ok(env_val) = std::env::var(var_name) {
                return Some(env_val);
            }
        }
    }
    if let Ok(env_val) = std::env::var(env_key) {
        return Some(env_val);
    }
    value.filter(|v| !(v.starts_with("${") && v.ends_with('}')))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_has_reasonable_values() {
        let config = Config::default();
        assert_eq!(config.chunking.chunk_size, 250);
        assert_eq!(config.chunking.overlap_size, 50);
        assert_eq!(config.gemini.embedding_dim, 768);
        assert_eq!(config.retrieval.top_k, 5);
        assert!((config.retrieval.min_score - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.pipeline.call_timeout, Duration::from_secs(15));
    }

    #[test]
    fn load_from_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "chunking:\n  chunk_size: 100\n  overlap_size: 10\nretrieval:\n  top_k: 3\n  min_score: 0.7"
        )
        .unwrap();

        let config = Config::load_from_file(file.path()).unwrap();
        assert_eq!(config.chunking.chunk_size, 100);
        assert_eq!(config.chunking.overlap_size, 10);
        assert_eq!(config.retrieval.top_k, 3);
        assert!((config.retrieval.min_score - 0.7).abs() < f32::EPSILON);
        // Untouched sections keep defaults
        assert_eq!(config.gemini.embedding_model, "text-embedding-004");
    }

    #[test]
    fn load_from_file_rejects_invalid_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "chunking: [not, a, mapping").unwrap();
        assert!(Config::load_from_file(file.path()).is_err());
    }

    #[test]
    fn resolve_env_string_returns_literal_when_env_unset() {
        let resolved = resolve_env_string(Some("literal".to_string()), "PRISMBREAK_TEST_UNSET");
        assert_eq!(resolved, Some("literal".to_string()));
    }

    #[test]
    fn resolve_env_string_env_key_wins_over_literal() {
        std::env::set_var("PRISMBREAK_TEST_KEY", "from-env-key");
        let resolved = resolve_env_string(Some("literal".to_string()), "PRISMBREAK_TEST_KEY");
        assert_eq!(resolved, Some("from-env-key".to_string()));
        std::env::remove_var("PRISMBREAK_TEST_KEY");
    }

    #[test]
    fn resolve_env_string_never_leaks_unresolved_reference() {
        let resolved = resolve_env_string(
            Some("${PRISMBREAK_TEST_DEFINITELY_UNSET}".to_string()),
            "PRISMBREAK_TEST_ALSO_UNSET",
        );
        assert_eq!(resolved, None);
    }

    #[test]
    fn resolve_env_string_resolves_reference() {
        std::env::set_var("PRISMBREAK_TEST_REF", "from-env");
        let resolved = resolve_env_string(
            Some("${PRISMBREAK_TEST_REF}".to_string()),
            "PRISMBREAK_TEST_UNSET",
        );
        assert_eq!(resolved, Some("from-env".to_string()));
        std::env::remove_var("PRISMBREAK_TEST_REF");
    }

    #[test]
    fn resolve_env_string_missing_everywhere_is_none() {
        let resolved = resolve_env_string(None, "PRISMBREAK_TEST_DEFINITELY_UNSET");
        assert_eq!(resolved, None);
    }

    #[test]
    fn max_workers_is_at_least_one() {
        let yaml: YamlConfig = serde_yaml::from_str("pipeline:\n  max_workers: 0").unwrap();
        let config = Config::from_yaml(yaml);
        assert_eq!(config.pipeline.max_workers, 1);
    }
}
