//! Embedding provider trait and the contract-enforcing `Embedder`

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::{Error, Result};

/// Vectors returned by one embedding call, in input order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbeddingResult {
    pub vectors: Vec<Vec<f32>>,
}

/// Trait for generating text embeddings
///
/// Implementations:
/// - `OpenAiEmbedder`: OpenAI embeddings API (text-embedding-3-small)
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of texts in one upstream call
    async fn embed(&self, texts: &[String]) -> Result<EmbeddingResult>;

    /// Dimension of the returned vectors
    fn dimensions(&self) -> usize;

    /// Model identifier
    fn model(&self) -> &str;

    /// Largest number of inputs accepted per call
    fn max_batch_size(&self) -> usize;

    /// Get provider name for logging
    fn name(&self) -> &str;
}

/// Wraps an [`EmbeddingProvider`] and checks every response
///
/// The same `Embedder` (same model and dimension) must serve ingestion and
/// queries, otherwise stored and query vectors are not comparable.
#[derive(Clone)]
pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
    dimensions: usize,
}

impl Embedder {
    /// Create an embedder that expects `dimensions`-long vectors
    pub fn new(provider: Arc<dyn EmbeddingProvider>, dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(Error::config("embedding dimension must be greater than zero"));
        }
        if provider.dimensions() != dimensions {
            return Err(Error::config(format!(
                "embedding provider '{}' produces {}-dim vectors, configured dimension is {}",
                provider.name(),
                provider.dimensions(),
                dimensions
            )));
        }
        Ok(Self {
            provider,
            dimensions,
        })
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }

    pub fn max_batch_size(&self) -> usize {
        self.provider.max_batch_size()
    }

    /// Embed a batch; either every text gets a vector or the call fails
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let limit = self.provider.max_batch_size();
        if texts.len() > limit {
            return Err(Error::embedding(format!(
                "batch of {} texts exceeds the provider limit of {}",
                texts.len(),
                limit
            )));
        }

        tracing::debug!(
            provider = self.provider.name(),
            model = self.provider.model(),
            batch_size = texts.len(),
            "embedding batch"
        );

        let result = self.provider.embed(texts).await?;

        if result.vectors.len() != texts.len() {
            return Err(Error::embedding(format!(
                "provider returned {} vectors for {} inputs",
                result.vectors.len(),
                texts.len()
            )));
        }
        if let Some(bad) = result.vectors.iter().find(|v| v.len() != self.dimensions) {
            return Err(Error::config(format!(
                "provider returned {}-dim vectors, index expects {}",
                bad.len(),
                self.dimensions
            )));
        }

        Ok(result.vectors)
    }

    /// Embed a single query string through the same path as ingestion
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| Error::embedding("provider returned no vector for the query"))
    }
}
