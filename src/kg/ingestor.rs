//! Idempotent upsert of episodes and facts into Neo4j.

use chrono::{DateTime, Utc};
use neo4rs::query;
use regex::Regex;
use tracing::{info, warn};
use uuid::Uuid;

use super::dedup::Fact;
use crate::graph::GraphStore;
use crate::{Error, Result};

/// One unit of ingested knowledge, created per source document.
#[derive(Debug, Clone)]
pub struct Episode {
    pub id: String,
    pub source_file: String,
    pub summary: String,
    pub embedding: Vec<f32>,
    pub user_scope: String,
    pub ingested_at: DateTime<Utc>,
}

impl Episode {
    /// Generate a fresh episode identifier.
    pub fn new_id() -> String {
        format!("ep_{}", Uuid::new_v4())
    }
}

/// Writes deduplicated facts and their episode into the graph.
///
/// Every MERGE is keyed so that concurrent identical upserts converge:
/// entities by `(name, user_scope)`, the relation edge additionally by
/// `episode_id`, the episode node by `(id, user_scope)`. Re-running an
/// episode refreshes only its embedding.
pub struct GraphIngestor {
    store: GraphStore,
    relation_filter: Regex,
}

/// Characters allowed in a relationship type; everything else becomes `_`.
const RELATION_FILTER: &str = r"[^A-Z0-9_]";

impl GraphIngestor {
    pub fn new(store: GraphStore) -> Result<Self> {
        let relation_filter = Regex::new(RELATION_FILTER)
            .map_err(|e| Error::InvalidArgument(format!("relation filter: {}", e)))?;
        Ok(Self {
            store,
            relation_filter,
        })
    }

    /// Normalize a relation label for use as a Cypher relationship type:
    /// uppercase, every other character replaced with `_`.
    pub fn sanitize_relation(&self, raw: &str) -> String {
        apply_relation_filter(raw, &self.relation_filter)
    }

    /// Upsert one episode and its facts. Each fact commits in its own
    /// transaction; a failing fact is logged and skipped without touching
    /// the ones already committed. Returns the number of facts committed.
    pub async fn ingest(&self, episode: &Episode, facts: &[Fact]) -> Result<usize> {
        let mut committed = 0;
        let mut first_err = None;

        for fact in facts {
            match self.upsert_fact(episode, fact).await {
                Ok(()) => committed += 1,
                Err(err) => {
                    warn!(
                        "skipping fact {} ({} -[{}]-> {}): {}",
                        fact.id, fact.start, fact.relation, fact.end, err
                    );
                    first_err.get_or_insert(err);
                }
            }
        }

        // A batch where nothing went through is a backend failure, not an
        // empty result.
        if committed == 0 {
            if let Some(err) = first_err {
                return Err(err);
            }
        }

        info!(
            "Ingested {}/{} facts for episode {}",
            committed,
            facts.len(),
            episode.id
        );
        Ok(committed)
    }

    async fn upsert_fact(&self, episode: &Episode, fact: &Fact) -> Result<()> {
        let relation = self.sanitize_relation(&fact.relation);
        let cypher = fact_cypher(&relation);

        let embedding: Vec<f64> = episode.embedding.iter().map(|v| *v as f64).collect();

        let q = query(&cypher)
            .param("start", fact.start.clone())
            .param("end", fact.end.clone())
            .param("user_scope", episode.user_scope.clone())
            .param("episode_id", episode.id.clone())
            .param("source_file", episode.source_file.clone())
            .param("summary", episode.summary.clone())
            .param("embedding", embedding)
            .param("ingested_at", episode.ingested_at.to_rfc3339());

        let mut txn = self.store.start_txn().await?;
        txn.run(q).await?;
        txn.commit().await?;
        Ok(())
    }
}

fn apply_relation_filter(raw: &str, filter: &Regex) -> String {
    let upper = raw.trim().to_uppercase();
    filter.replace_all(&upper, "_").into_owned()
}

/// Build the upsert statement for one fact.
///
/// The relationship type cannot be a parameter in Cypher; splicing it is
/// safe only because `sanitize_relation` restricts it to `[A-Z0-9_]`.
fn fact_cypher(relation: &str) -> String {
    format!(
        "MERGE (a:Entity {{name: $start, user_scope: $user_scope}})
         MERGE (b:Entity {{name: $end, user_scope: $user_scope}})
         MERGE (a)-[r:{} {{episode_id: $episode_id, user_scope: $user_scope}}]->(b)
         MERGE (ep:Episode {{id: $episode_id, user_scope: $user_scope}})
           ON CREATE SET ep.source_file = $source_file,
                         ep.summary = $summary,
                         ep.embedding = $embedding,
                         ep.ingested_at = $ingested_at
           ON MATCH SET ep.embedding = $embedding
         MERGE (ep)-[:MENTIONS {{user_scope: $user_scope}}]->(a)
         MERGE (ep)-[:MENTIONS {{user_scope: $user_scope}}]->(b)",
        relation
    )
}
