//! Answer a question against the knowledge graph.
//!
//! Two modes: `semantic` embeds the question and searches the episode
//! vector index; `cypher` generates a validated read-only query and runs
//! it. Both feed the answer composer.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use prismbreak::api::QueryAnswer;
use prismbreak::{
    AnswerComposer, Config, Embedder, GeminiClient, GraphStore, QueryExecutor, QuerySynthesizer,
    SemanticRetriever,
};

#[derive(Parser)]
#[command(name = "chat")]
#[command(about = "Ask a question against the knowledge graph")]
struct Cli {
    /// The question to answer
    question: String,

    /// Answer mode: semantic | cypher
    #[arg(long, default_value = "semantic")]
    mode: String,

    /// How many episodes to retrieve (semantic mode)
    #[arg(long)]
    top_k: Option<usize>,

    /// Minimum similarity score (semantic mode)
    #[arg(long)]
    min_score: Option<f32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("prismbreak=info".parse()?))
        .init();

    let cli = Cli::parse();
    let config = Config::load();

    let store = GraphStore::connect(&config.neo4j).await?;
    let client = GeminiClient::new(&config.gemini)?;
    let composer = AnswerComposer::new(
        client.clone(),
        config.retrieval.answer_max_rows,
        512,
        config.pipeline.answer_temperature,
    );

    match cli.mode.as_str() {
        "semantic" => {
            let embedder = Embedder::new(
                client.clone(),
                config.gemini.embedding_dim,
                config.pipeline.call_timeout,
            );
            let retriever = SemanticRetriever::new(
                store,
                embedder,
                &config.retrieval.vector_index,
                config.pipeline.call_timeout,
            );

            let top_k = cli.top_k.unwrap_or(config.retrieval.top_k);
            let min_score = cli.min_score.unwrap_or(config.retrieval.min_score);
            let episodes = retriever.search(&cli.question, top_k, min_score).await?;

            if episodes.is_empty() {
                println!("{}", prismbreak::NO_RESULTS_ANSWER);
                return Ok(());
            }

            println!("Matching episodes:");
            for episode in &episodes {
                println!(
                    "  {:.3}  {} ({})",
                    episode.score, episode.source_file, episode.episode_id
                );
            }

            let answer = composer
                .compose_from_episodes(&cli.question, &episodes)
                .await?;
            println!("\n{}", answer);
        }
        "cypher" => {
            let synthesizer = QuerySynthesizer::new(
                client.clone(),
                config.pipeline.max_tokens,
                config.pipeline.temperature,
            );
            let executor = QueryExecutor::new(
                store,
                config.retrieval.row_limit,
                config.pipeline.call_timeout,
            );

            let generated = synthesizer.synthesize(&cli.question).await?;
            println!("Generated query:\n{}\n", generated.query);

            let rows = executor.execute(&generated).await?;
            let answer = composer.compose(&cli.question, &rows).await?;

            let payload = QueryAnswer {
                query: generated.query,
                params: generated.params,
                rows,
                answer: answer.clone(),
            };
            println!("{} rows returned", payload.rows.len());
            println!("\n{}", answer);
        }
        other => anyhow::bail!("unknown mode: {} (expected semantic or cypher)", other),
    }

    Ok(())
}
