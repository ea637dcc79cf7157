//! Ingest text documents into the Neo4j knowledge graph.
//!
//! Reads each file, runs it through the ingestion pipeline (chunk ->
//! extract -> dedupe -> embed -> upsert), and prints a per-file report.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use prismbreak::api::IngestRequest;
use prismbreak::{Config, GraphStore, IngestPipeline};

#[derive(Parser)]
#[command(name = "ingest")]
#[command(about = "Ingest documents into the Neo4j knowledge graph")]
struct Cli {
    /// Text files to ingest
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// User scope for graph entities
    #[arg(long, default_value = "public")]
    user: String,

    /// Re-ingest under an existing episode id (single file only)
    #[arg(long)]
    episode_id: Option<String>,

    /// Override chunk size (words)
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Override overlap size (words)
    #[arg(long)]
    overlap: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("prismbreak=info".parse()?))
        .init();

    let cli = Cli::parse();
    if cli.episode_id.is_some() && cli.files.len() > 1 {
        anyhow::bail!("--episode-id only makes sense with a single file");
    }

    let mut config = Config::load();
    if let Some(size) = cli.chunk_size {
        config.chunking.chunk_size = size;
    }
    if let Some(overlap) = cli.overlap {
        config.chunking.overlap_size = overlap;
    }

    let store = GraphStore::connect(&config.neo4j).await?;
    store.init_schema().await?;
    store
        .ensure_vector_index(&config.retrieval.vector_index, config.gemini.embedding_dim)
        .await?;

    let pipeline = IngestPipeline::new(&config, store.clone())?;

    for path in &cli.files {
        let text = tokio::fs::read_to_string(path).await?;
        let source_file = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        let report = pipeline
            .ingest_document(IngestRequest {
                episode_id: cli.episode_id.clone(),
                source_file: source_file.clone(),
                user_scope: cli.user.clone(),
                text,
                images: Vec::new(),
            })
            .await?;

        println!(
            "{}: episode {}: {} chunks, {} candidates, {} facts ingested ({} units failed)",
            source_file,
            report.episode_id,
            report.chunks,
            report.candidates,
            report.facts_ingested,
            report.units_failed
        );
    }

    let stats = store.stats().await?;
    println!(
        "Graph now holds {} entities, {} episodes, {} relationships",
        stats.entity_count, stats.episode_count, stats.relation_count
    );

    Ok(())
}
