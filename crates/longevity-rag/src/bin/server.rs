//! RAG Server binary
//!
//! Run with: cargo run -p longevity-rag --bin longevity-rag-server

use std::path::Path;

use longevity_rag::{
    config::{self, RagConfig, ENV_FILE},
    server::RagServer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_loaded = config::load_env_file(Path::new(ENV_FILE))?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "longevity_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if env_loaded {
        tracing::info!("Loaded environment from {}", ENV_FILE);
    }

    let config = RagConfig::load()?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Embedding model: {}", config.embeddings.model);
    tracing::info!("  - Embedding dimensions: {}", config.embeddings.dimensions);
    tracing::info!("  - Chat model: {}", config.generation.model);
    tracing::info!("  - Vector backend: {:?}", config.vector_db.backend);
    tracing::info!("  - Top k: {}", config.retrieval.top_k);

    let server = RagServer::new(config).await?;

    println!("\nServer starting...");
    println!("  Health: http://{}/", server.address());
    println!("  Ask:    POST http://{}/ask", server.address());
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
