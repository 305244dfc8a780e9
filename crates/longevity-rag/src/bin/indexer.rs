//! Document indexer binary
//!
//! Run with: cargo run -p longevity-rag --bin longevity-rag-indexer -- --data-dir data

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use longevity_rag::{
    config::{self, RagConfig, VectorBackend, CONFIG_PATH_VAR, ENV_FILE},
    ingestion::{Indexer, IndexerSettings, IngestStatus, RecursiveChunker},
    providers::Providers,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Load, chunk, embed and upload a document directory into the vector index
#[derive(Debug, Parser)]
#[command(name = "longevity-rag-indexer", version, about)]
struct Args {
    /// Directory containing .pdf and .txt documents
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// TOML config file (overrides RAG_CONFIG)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Chunks per embedding/upsert batch
    #[arg(long)]
    batch_size: Option<usize>,

    /// Descend into subdirectories
    #[arg(long)]
    recursive: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let env_loaded = config::load_env_file(Path::new(ENV_FILE))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "longevity_rag=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    if env_loaded {
        tracing::info!("Loaded environment from {}", ENV_FILE);
    }

    let mut config = match &args.config {
        Some(path) => RagConfig::from_file(path)?,
        None => match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) if !path.trim().is_empty() => RagConfig::from_file(Path::new(&path))?,
            _ => RagConfig::default(),
        },
    };
    config.apply_overrides(|key| std::env::var(key).ok())?;
    if let Some(dir) = args.data_dir {
        config.ingestion.data_dir = dir;
    }
    if let Some(batch_size) = args.batch_size {
        config.ingestion.batch_size = batch_size;
    }
    if args.recursive {
        config.ingestion.recursive = true;
    }
    config.validate()?;

    if config.vector_db.backend == VectorBackend::Memory {
        tracing::warn!("Memory vector backend selected: the index is discarded when the indexer exits");
    }

    let providers = Providers::from_config(&config)?;
    let indexer = Indexer::new(
        RecursiveChunker::from_config(&config.chunking)?,
        providers.embedder.clone(),
        providers.store.clone(),
        IndexerSettings::from_config(&config),
    )?;

    let progress = ProgressBar::new(0);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} batches {msg}")?
            .progress_chars("#>-"),
    );

    let report = indexer
        .run_with(&config.ingestion.data_dir, |outcome, total| {
            progress.set_length(total as u64);
            progress.inc(1);
            if let Some(failure) = &outcome.failure {
                progress.println(format!(
                    "batch {} ({}..{}) failed: {}",
                    failure.batch, failure.first_id, failure.last_id, failure.reason
                ));
            }
        })
        .await?;
    progress.finish_and_clear();

    for skipped in &report.skipped {
        println!("skipped {}: {}", skipped.path.display(), skipped.reason);
    }
    println!(
        "documents: {} found, {} loaded, {} skipped",
        report.documents_found,
        report.documents_loaded,
        report.skipped.len()
    );
    println!(
        "chunks: {} uploaded of {} ({} failed batches) in {:.1}s",
        report.chunks_uploaded,
        report.chunks_total,
        report.failures.len(),
        report.elapsed.as_secs_f64()
    );

    let status = report.status();
    println!("status: {:?}", status);

    Ok(match status {
        IngestStatus::Failed => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    })
}
