//! Coach RAG command line
//!
//! `coach-rag search <query>` embeds the query and prints the ranked hits of the
//! query collection. Without arguments it runs an interactive coaching chat on
//! stdin.

use anyhow::{Context, Result};
use coach_rag::{
    answering::{AnsweringPipeline, AnswerOrigin, RankStage, RetrievalAnsweringService, StaticAnswers, TokenEstimator},
    config::Config,
    documents::{DocumentIndexCache, DocumentIndexer, FolderSource},
    embedding::{EmbeddingClient, EmbeddingProvider},
    error::{AnswerError, CoachError},
    generation::GenerationClient,
    observability::init_observability,
    vector_db,
};
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config_path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    let config = if Path::new(&config_path).exists() {
        Config::from_file_with_env(&config_path)
            .with_context(|| format!("loading configuration from {}", config_path))?
    } else {
        let config = Config::default_config();
        config.validate().context("default configuration is incomplete")?;
        config
    };

    init_observability(&config.logging.level, &config.logging.format);
    info!("Starting coach-rag");

    let store = vector_db::connect(&config.vector_db)
        .await
        .context("connecting to the vector store")?;
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(EmbeddingClient::new(config.embedding.clone())?);

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("search") => {
            let query = args[1..].join(" ");
            let pipeline = AnsweringPipeline::new(embedder, RankStage::new(store, config.vector_db.clone()));
            let hits = pipeline.run(&query).await?;

            println!("{:<24} {}", "id", "score");
            for hit in hits {
                println!("{:<24} {:.6}", hit.id, hit.distance);
            }
            Ok(())
        }
        Some(other) => anyhow::bail!("unknown command: {} (expected `search <query>`)", other),
        None => chat(config, store, embedder).await,
    }
}

async fn chat(
    config: Config,
    store: Arc<dyn vector_db::VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
) -> Result<()> {
    let static_answers = match &config.answering.static_answers_path {
        Some(path) => StaticAnswers::from_json_file(path)?,
        None => StaticAnswers::builtin(),
    };

    let index = match &config.documents.path {
        Some(path) => {
            let indexer = DocumentIndexer::new(
                Arc::new(FolderSource::new()),
                embedder.clone(),
                store,
                config.documents.clone(),
                TokenEstimator::new(config.answering.token_estimator),
                config.answering.similarity_top_k,
            );
            let cache = DocumentIndexCache::new(indexer);
            match cache.get_or_build(path).await {
                Ok(index) => Some(index),
                Err(e) => {
                    error!("Could not index documents in {}: {}", path.display(), e);
                    None
                }
            }
        }
        None => {
            warn!("No documents folder configured");
            None
        }
    };

    let service = RetrievalAnsweringService::new(
        Arc::new(static_answers),
        embedder,
        Arc::new(GenerationClient::new(config.generation.clone())?),
        index,
        config.answering.clone(),
        &config.generation,
    );
    let mut session = service.new_session();

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    stdout.write_all(b"Ask your coach (\"quit\" to exit)\n> ").await?;
    stdout.flush().await?;

    while let Some(line) = lines.next_line().await? {
        let query = line.trim_end_matches(['\r', '\n']);
        match query {
            "quit" | "exit" => break,
            ":metrics" => {
                stdout.write_all(service.metrics().export_prometheus().as_bytes()).await?;
            }
            "" => {}
            _ => match service.answer(&mut session, query).await {
                Ok(answer) => {
                    let mut out = format!("\n{}\n", answer.text);
                    if !answer.sources.is_empty() {
                        let heading = match answer.origin {
                            AnswerOrigin::Static => "Sources",
                            AnswerOrigin::Generated => "Retrieved from",
                        };
                        out.push_str(&format!("\n{}:\n", heading));
                        for source in &answer.sources {
                            out.push_str(&format!("  - {}\n", source));
                        }
                    }
                    stdout.write_all(out.as_bytes()).await?;
                }
                Err(CoachError::Answer(AnswerError::NoIndexAvailable)) => {
                    stdout
                        .write_all(b"No documents are loaded; only the built-in questions can be answered.\n")
                        .await?;
                }
                Err(e) => {
                    error!("Failed to answer: {}", e);
                    stdout.write_all(format!("Error: {}\n", e).as_bytes()).await?;
                }
            },
        }
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
    }

    info!("Chat session {} ended after {} messages", session.id, session.messages().len());
    Ok(())
}
