//! Graph database integration with Neo4j.

use neo4rs::{query, BoltType, Graph, Query, Txn};
use serde_json::Value as JsonValue;
use tracing::{debug, info};

use crate::config::Neo4jConfig;
use crate::{Error, Result};

/// One row from the episode vector index.
#[derive(Debug, Clone)]
pub struct EpisodeRow {
    pub source_file: String,
    pub episode_id: String,
    pub summary: String,
    pub user_scope: String,
    pub score: f32,
}

/// Graph store backed by Neo4j. Cloning shares the underlying connection
/// pool, which is safe for concurrent sessions.
#[derive(Clone)]
pub struct GraphStore {
    graph: Graph,
}

impl GraphStore {
    /// Connect to a Neo4j server.
    pub async fn connect(config: &Neo4jConfig) -> Result<Self> {
        let graph = Graph::new(&config.uri, &config.user, &config.password).await?;
        Ok(Self { graph })
    }

    /// Run a write query, discarding results.
    pub async fn run(&self, q: Query) -> Result<()> {
        self.graph.run(q).await?;
        Ok(())
    }

    /// Open an explicit transaction.
    pub async fn start_txn(&self) -> Result<Txn> {
        Ok(self.graph.start_txn().await?)
    }

    /// Initialize schema with constraints and indexes.
    ///
    /// Every key is composite with `user_scope`: entities and episodes are
    /// unique per scope, never globally.
    pub async fn init_schema(&self) -> Result<()> {
        info!("Initializing Neo4j schema...");

        let constraints = [
            "CREATE CONSTRAINT entity_identity IF NOT EXISTS \
             FOR (e:Entity) REQUIRE (e.name, e.user_scope) IS UNIQUE",
            "CREATE CONSTRAINT episode_identity IF NOT EXISTS \
             FOR (ep:Episode) REQUIRE (ep.id, ep.user_scope) IS UNIQUE",
        ];

        for constraint in constraints {
            self.graph.run(query(constraint)).await?;
        }

        let indexes = [
            "CREATE INDEX entity_name IF NOT EXISTS FOR (e:Entity) ON (e.name)",
            "CREATE INDEX episode_source IF NOT EXISTS FOR (ep:Episode) ON (ep.source_file)",
        ];

        for index in indexes {
            self.graph.run(query(index)).await?;
        }

        info!("Schema initialized successfully");
        Ok(())
    }

    /// Create the episode embedding vector index if it does not exist yet.
    pub async fn ensure_vector_index(&self, name: &str, dimension: usize) -> Result<()> {
        if !is_identifier(name) {
            return Err(Error::InvalidArgument(format!(
                "invalid vector index name: {}",
                name
            )));
        }

        let mut result = self
            .graph
            .execute(query("SHOW INDEXES YIELD name RETURN name"))
            .await?;

        while let Some(row) = result.next().await? {
            if row.get::<String>("name").map(|n| n == name).unwrap_or(false) {
                debug!("Vector index '{}' already exists, skipping", name);
                return Ok(());
            }
        }

        info!("Creating vector index '{}' ({} dims)", name, dimension);
        let create = format!(
            "CREATE VECTOR INDEX {} \
             FOR (ep:Episode) ON (ep.embedding) \
             OPTIONS {{indexConfig: {{\
             `vector.dimensions`: {}, \
             `vector.similarity_function`: 'cosine'}}}}",
            name, dimension
        );
        self.graph.run(query(&create)).await?;
        Ok(())
    }

    /// Nearest-neighbor search over episode embeddings.
    pub async fn vector_query(
        &self,
        index: &str,
        top_k: usize,
        embedding: &[f32],
    ) -> Result<Vec<EpisodeRow>> {
        let embedding: Vec<f64> = embedding.iter().map(|v| *v as f64).collect();

        let q = query(
            "CALL db.index.vector.queryNodes($index_name, $top_k, $embedding)
             YIELD node, score
             RETURN node.source_file AS source_file,
                    node.id AS episode_id,
                    node.summary AS summary,
                    node.user_scope AS user_scope,
                    score",
        )
        .param("index_name", index.to_string())
        .param("top_k", top_k as i64)
        .param("embedding", embedding);

        let mut result = self.graph.execute(q).await?;
        let mut rows = Vec::new();

        while let Some(row) = result.next().await? {
            rows.push(EpisodeRow {
                source_file: row
                    .get::<String>("source_file")
                    .unwrap_or_else(|_| "unknown".to_string()),
                episode_id: row
                    .get::<String>("episode_id")
                    .unwrap_or_else(|_| "unknown".to_string()),
                summary: row.get::<String>("summary").unwrap_or_default(),
                user_scope: row
                    .get::<String>("user_scope")
                    .unwrap_or_else(|_| "unknown".to_string()),
                score: row.get::<f64>("score").unwrap_or(0.0) as f32,
            });
        }

        debug!("Vector query returned {} rows", rows.len());
        Ok(rows)
    }

    /// Execute a parameterized read query, decoding each row to JSON.
    ///
    /// At most `row_cap` rows are pulled from the stream regardless of what
    /// the store would return.
    pub async fn fetch_rows(
        &self,
        cypher: &str,
        params: &serde_json::Map<String, JsonValue>,
        row_cap: usize,
    ) -> Result<Vec<JsonValue>> {
        let mut q = query(cypher);
        for (key, value) in params {
            q = q.param(key, json_param(value)?);
        }

        let mut result = self.graph.execute(q).await?;
        let mut rows = Vec::new();

        while rows.len() < row_cap {
            match result.next().await? {
                Some(row) => {
                    let value = row
                        .to::<JsonValue>()
                        .map_err(|e| Error::Storage(format!("row decode failed: {}", e)))?;
                    rows.push(value);
                }
                None => break,
            }
        }

        Ok(rows)
    }

    /// Get graph statistics.
    pub async fn stats(&self) -> Result<GraphStats> {
        let counts = query(
            "MATCH (e:Entity) WITH count(e) as entities
             MATCH (ep:Episode) WITH entities, count(ep) as episodes
             MATCH ()-[r]->() WITH entities, episodes, count(r) as relations
             RETURN entities, episodes, relations",
        );

        let mut result = self.graph.execute(counts).await?;

        if let Some(row) = result.next().await? {
            return Ok(GraphStats {
                entity_count: row.get::<i64>("entities").unwrap_or(0) as u64,
                episode_count: row.get::<i64>("episodes").unwrap_or(0) as u64,
                relation_count: row.get::<i64>("relations").unwrap_or(0) as u64,
            });
        }

        Ok(GraphStats::default())
    }
}

/// Graph statistics.
#[derive(Debug, Default)]
pub struct GraphStats {
    pub entity_count: u64,
    pub episode_count: u64,
    pub relation_count: u64,
}

/// Convert a JSON parameter value to a Bolt value.
///
/// Generated queries are only allowed scalar parameters; anything else is a
/// contract violation by the generator.
fn json_param(value: &JsonValue) -> Result<BoltType> {
    match value {
        JsonValue::String(s) => Ok(s.clone().into()),
        JsonValue::Bool(b) => Ok((*b).into()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i.into())
            } else if let Some(f) = n.as_f64() {
                Ok(f.into())
            } else {
                Err(Error::Parse(format!("unrepresentable number: {}", n)))
            }
        }
        other => Err(Error::Parse(format!(
            "unsupported parameter type: {}",
            other
        ))),
    }
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
