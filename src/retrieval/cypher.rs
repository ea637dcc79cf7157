//! Natural-language-to-Cypher translation with a read-only safety gate.
//!
//! The synthesizer asks Gemini for a JSON object holding a parameterized
//! query template and its parameter values. [`CypherGuard`] then checks the
//! template against a restricted read-only grammar and a forbidden-token
//! scan before the executor is allowed to run it. Validation is
//! unconditional: the executor refuses anything that has not passed the
//! guard, no matter where the query text came from.

use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Map, Value as JsonValue};
use tracing::{debug, info};

use crate::graph::GraphStore;
use crate::integrations::GeminiClient;
use crate::kg::extractor::strip_code_fences;
use crate::prompts::Prompt;
use crate::timeout::with_timeout;
use crate::{Error, Result};

/// A generated, parameterized query plus its parameter values.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedQuery {
    pub query: String,
    #[serde(default)]
    pub params: Map<String, JsonValue>,
}

/// Translates a natural-language question into a restricted Cypher query.
pub struct QuerySynthesizer {
    client: GeminiClient,
    system_prompt: String,
    max_tokens: u32,
    temperature: f32,
}

impl QuerySynthesizer {
    pub fn new(client: GeminiClient, max_tokens: u32, temperature: f32) -> Self {
        Self {
            client,
            system_prompt: Prompt::CypherGeneration.load(),
            max_tokens,
            temperature,
        }
    }

    /// Generate a query for the question. The output is parsed but NOT yet
    /// validated; run it through the executor (which applies the guard) or
    /// [`CypherGuard::validate`] directly.
    pub async fn synthesize(&self, question: &str) -> Result<GeneratedQuery> {
        let user = format!("User question: {}", question);
        let raw = self
            .client
            .generate_json(&self.system_prompt, &user, self.max_tokens, self.temperature)
            .await?;

        let generated = parse_generated_query(&raw)?;
        debug!("Generated query: {}", generated.query);
        Ok(generated)
    }
}

/// Parse the generator's JSON output into a [`GeneratedQuery`].
pub fn parse_generated_query(raw: &str) -> Result<GeneratedQuery> {
    let cleaned = strip_code_fences(raw);
    let generated: GeneratedQuery = serde_json::from_str(cleaned)
        .map_err(|e| Error::Parse(format!("query generation output: {}", e)))?;

    if generated.query.trim().is_empty() {
        return Err(Error::Parse("generated query is empty".to_string()));
    }
    if !generated.query.contains("$row_limit") {
        return Err(Error::Parse(
            "generated query does not carry the $row_limit parameter".to_string(),
        ));
    }
    Ok(generated)
}

/// Tokens whose presence anywhere in a query marks it as mutating. The scan
/// is deliberately blunt: it runs on tokens, case-insensitively, and does
/// not care whether the token sits inside an otherwise valid read query.
const FORBIDDEN_TOKENS: &[&str] = &[
    "CREATE", "DELETE", "MERGE", "SET", "REMOVE", "DROP", "DETACH", "FOREACH", "LOAD",
];

/// Tokens allowed to open the first clause of a read query.
const OPENING_TOKENS: &[&str] = &["MATCH", "OPTIONAL", "UNWIND", "WITH", "RETURN", "CALL"];

/// Read-only validator for generated Cypher.
pub struct CypherGuard;

impl CypherGuard {
    /// Reject anything that is not a read-only retrieval query.
    ///
    /// Two independent checks, both mandatory: a forbidden-token scan for
    /// mutation verbs, and a shape check that the statement opens with a
    /// retrieval clause, RETURNs something, and only CALLs the vector index
    /// procedure. Token scanning can over-reject (a literal value spelled
    /// like a verb); that trade-off is accepted.
    pub fn validate(query: &str) -> Result<()> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Err(Error::SafetyViolation("empty query".to_string()));
        }
        let upper = trimmed.to_uppercase();

        for token in tokens(&upper) {
            if FORBIDDEN_TOKENS.contains(&token) {
                return Err(Error::SafetyViolation(format!(
                    "query contains mutating token {}",
                    token
                )));
            }
        }

        let first = match tokens(&upper).next() {
            Some(token) => token,
            None => return Err(Error::SafetyViolation("no clauses found".to_string())),
        };
        if !OPENING_TOKENS.contains(&first) {
            return Err(Error::SafetyViolation(format!(
                "query must open with a retrieval clause, found {}",
                first
            )));
        }

        if !tokens(&upper).any(|t| t == "RETURN") {
            return Err(Error::SafetyViolation(
                "query has no RETURN clause".to_string(),
            ));
        }

        validate_calls(&upper)?;
        Ok(())
    }
}

/// Every CALL must target the vector similarity procedure; arbitrary
/// procedures are an escape hatch out of the read-only contract.
fn validate_calls(upper: &str) -> Result<()> {
    let bytes = upper.as_bytes();
    for (pos, _) in upper.match_indices("CALL") {
        let before_ok = pos == 0 || !is_ident_byte(bytes[pos - 1]);
        let after = pos + 4;
        let after_ok = after >= bytes.len() || !is_ident_byte(bytes[after]);
        if !(before_ok && after_ok) {
            continue; // part of a longer identifier, not the CALL keyword
        }

        let rest = upper[after..].trim_start();
        if !rest.starts_with("DB.INDEX.VECTOR.") {
            return Err(Error::SafetyViolation(
                "CALL is only allowed for db.index.vector procedures".to_string(),
            ));
        }
    }
    Ok(())
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn tokens(s: &str) -> impl Iterator<Item = &str> {
    s.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|t| !t.is_empty())
}

/// Runs validated queries with a row cap and a time budget.
pub struct QueryExecutor {
    store: GraphStore,
    row_cap: usize,
    budget: Duration,
}

impl QueryExecutor {
    pub fn new(store: GraphStore, row_cap: usize, budget: Duration) -> Self {
        Self {
            store,
            row_cap,
            budget,
        }
    }

    /// The row cap enforced on every execution.
    pub fn row_cap(&self) -> usize {
        self.row_cap
    }

    /// Validate and execute a generated query.
    ///
    /// The guard runs here, unconditionally, so no caller can execute an
    /// unvalidated template. The configured row cap overrides whatever the
    /// generator put in `row_limit`, and results are truncated at the cap
    /// even if the store returns more.
    pub async fn execute(&self, generated: &GeneratedQuery) -> Result<Vec<JsonValue>> {
        CypherGuard::validate(&generated.query)?;

        let mut params = generated.params.clone();
        params.insert("row_limit".to_string(), json!(self.row_cap as i64));

        let rows = with_timeout(
            self.budget,
            "graph query",
            self.store.fetch_rows(&generated.query, &params, self.row_cap),
        )
        .await?;

        info!("Query returned {} rows (cap {})", rows.len(), self.row_cap);
        Ok(rows)
    }
}
