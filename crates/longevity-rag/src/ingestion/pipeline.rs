//! Ingestion pipeline orchestration: load, chunk, embed, upsert

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::providers::{Embedder, IndexSpec, IndexedRecord, VectorStoreProvider};
use crate::types::{Chunk, Document};

use super::chunker::RecursiveChunker;
use super::parser::{DocumentLoader, SkippedDocument};

/// Settings for one indexing run
#[derive(Debug, Clone)]
pub struct IndexerSettings {
    /// Index the run writes to
    pub index: IndexSpec,
    /// Chunks per embedding/upsert batch
    pub batch_size: usize,
    /// Descend into subdirectories
    pub recursive: bool,
}

impl IndexerSettings {
    pub fn from_config(config: &RagConfig) -> Self {
        Self {
            index: config.index_spec(),
            batch_size: config.ingestion.batch_size,
            recursive: config.ingestion.recursive,
        }
    }
}

/// A batch that could not be embedded or stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    /// 1-based batch number
    pub batch: usize,
    pub first_id: String,
    pub last_id: String,
    pub reason: String,
}

/// What happened to one batch, reported to the run observer
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// 1-based batch number
    pub batch: usize,
    /// Chunks in the batch
    pub size: usize,
    /// Records the store accepted
    pub uploaded: usize,
    pub failure: Option<BatchFailure>,
}

/// Overall result of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStatus {
    /// The directory holds no supported file
    NoDocuments,
    /// Supported files were found but every one was skipped
    AllSkipped,
    /// Documents loaded but produced no chunks
    NoChunks,
    /// Every chunk was uploaded
    Complete,
    /// Some batches failed
    Partial,
    /// Nothing was uploaded
    Failed,
}

/// Summary of an ingestion run
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub documents_found: usize,
    pub documents_loaded: usize,
    pub skipped: Vec<SkippedDocument>,
    pub chunks_total: usize,
    pub chunks_uploaded: usize,
    pub batches: usize,
    pub failures: Vec<BatchFailure>,
    pub elapsed: Duration,
}

impl IngestReport {
    pub fn status(&self) -> IngestStatus {
        if self.documents_found == 0 {
            IngestStatus::NoDocuments
        } else if self.documents_loaded == 0 {
            IngestStatus::AllSkipped
        } else if self.chunks_total == 0 {
            IngestStatus::NoChunks
        } else if self.chunks_uploaded == 0 {
            IngestStatus::Failed
        } else if !self.failures.is_empty() || self.chunks_uploaded < self.chunks_total {
            IngestStatus::Partial
        } else {
            IngestStatus::Complete
        }
    }
}

/// Batch ingestion of a document directory into a vector index
pub struct Indexer {
    chunker: RecursiveChunker,
    loader: DocumentLoader,
    embedder: Arc<Embedder>,
    store: Arc<dyn VectorStoreProvider>,
    settings: IndexerSettings,
}

impl Indexer {
    /// Create an indexer; the index dimension must match the embedder
    pub fn new(
        chunker: RecursiveChunker,
        embedder: Arc<Embedder>,
        store: Arc<dyn VectorStoreProvider>,
        settings: IndexerSettings,
    ) -> Result<Self> {
        if settings.batch_size == 0 {
            return Err(Error::config("batch size must be greater than zero"));
        }
        if settings.batch_size > embedder.max_batch_size() {
            return Err(Error::config(format!(
                "batch size {} exceeds the embedding provider limit of {}",
                settings.batch_size,
                embedder.max_batch_size()
            )));
        }
        if settings.index.dimension != embedder.dimensions() {
            return Err(Error::config(format!(
                "index '{}' is {}-dim but the embedder produces {}-dim vectors",
                settings.index.name,
                settings.index.dimension,
                embedder.dimensions()
            )));
        }

        Ok(Self {
            chunker,
            loader: DocumentLoader::new(settings.recursive),
            embedder,
            store,
            settings,
        })
    }

    /// Chunk documents in order, numbering chunks `id-1..id-N` across all of them
    pub fn chunk_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let mut next_id: u64 = 1;

        for doc in documents {
            let source = doc.filename();
            let spans = self.chunker.split(&doc.text);
            tracing::debug!("{}: {} chunks", source, spans.len());

            for (chunk_index, span) in spans.into_iter().enumerate() {
                chunks.push(Chunk {
                    id: Chunk::record_id(next_id),
                    content: span.text,
                    source: source.clone(),
                    chunk_index: chunk_index as u32,
                });
                next_id += 1;
            }
        }

        chunks
    }

    /// Run ingestion over `dir`
    pub async fn run(&self, dir: &Path) -> Result<IngestReport> {
        self.run_with(dir, |_, _| {}).await
    }

    /// Run ingestion, calling `observer(outcome, total_batches)` after every batch
    ///
    /// Fatal errors (index mismatch, missing directory, bad configuration) are
    /// returned; a batch that fails for any other reason is recorded in the
    /// report and the run moves on to the next batch.
    pub async fn run_with<F>(&self, dir: &Path, mut observer: F) -> Result<IngestReport>
    where
        F: FnMut(&BatchOutcome, usize),
    {
        let started = Instant::now();
        let index = &self.settings.index;

        tracing::info!(
            "Ensuring index '{}' ({} dims, {:?}) on {}",
            index.name,
            index.dimension,
            index.metric,
            self.store.name()
        );
        self.store.ensure_index(index).await?;

        let loaded = self.loader.load_dir(dir)?;
        tracing::info!(
            "Loaded {} of {} documents from {}",
            loaded.documents.len(),
            loaded.found,
            dir.display()
        );

        let mut report = IngestReport {
            documents_found: loaded.found,
            documents_loaded: loaded.documents.len(),
            skipped: loaded.skipped,
            ..Default::default()
        };

        if loaded.documents.is_empty() {
            tracing::warn!("No documents to index in {}", dir.display());
            report.elapsed = started.elapsed();
            return Ok(report);
        }

        let chunks = self.chunk_documents(&loaded.documents);
        report.chunks_total = chunks.len();
        let total_batches = chunks.len().div_ceil(self.settings.batch_size);
        tracing::info!(
            "Indexing {} chunks in {} batches of up to {}",
            chunks.len(),
            total_batches,
            self.settings.batch_size
        );

        for (i, batch) in chunks.chunks(self.settings.batch_size).enumerate() {
            let number = i + 1;
            let outcome = match self.process_batch(batch).await {
                Ok(uploaded) => {
                    tracing::info!("Batch {}/{}: uploaded {} chunks", number, total_batches, uploaded);
                    BatchOutcome {
                        batch: number,
                        size: batch.len(),
                        uploaded,
                        failure: None,
                    }
                }
                Err(e @ Error::Config(_)) => return Err(e),
                Err(e) => {
                    tracing::error!("Batch {}/{} failed: {}", number, total_batches, e);
                    BatchOutcome {
                        batch: number,
                        size: batch.len(),
                        uploaded: 0,
                        failure: Some(BatchFailure {
                            batch: number,
                            first_id: batch.first().map(|c| c.id.clone()).unwrap_or_default(),
                            last_id: batch.last().map(|c| c.id.clone()).unwrap_or_default(),
                            reason: e.to_string(),
                        }),
                    }
                }
            };

            report.batches += 1;
            report.chunks_uploaded += outcome.uploaded;
            if let Some(failure) = &outcome.failure {
                report.failures.push(failure.clone());
            }
            observer(&outcome, total_batches);
        }

        report.elapsed = started.elapsed();
        tracing::info!(
            "Ingestion finished: {}/{} chunks uploaded, {} failed batches in {:?}",
            report.chunks_uploaded,
            report.chunks_total,
            report.failures.len(),
            report.elapsed
        );

        Ok(report)
    }

    /// Embed one batch and upsert it; all-or-nothing per batch
    async fn process_batch(&self, batch: &[Chunk]) -> Result<usize> {
        let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;

        let records: Vec<IndexedRecord> = batch
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexedRecord {
                id: chunk.id.clone(),
                vector,
                payload: chunk.to_payload(),
            })
            .collect();

        self.store.upsert(&records).await
    }
}
