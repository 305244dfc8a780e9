//! Similarity search over the vector index

use std::cmp::Ordering;
use std::sync::Arc;

use crate::config::RetrievalConfig;
use crate::error::{Error, Result};
use crate::providers::{Embedder, VectorStoreProvider};

/// A chunk retrieved as context
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedPassage {
    pub id: String,
    /// Similarity score, higher is more similar
    pub score: f32,
    pub text: String,
    /// Source file name, when the payload carries one
    pub source: Option<String>,
}

/// Embeds questions and fetches the nearest chunks
pub struct Retriever {
    embedder: Arc<Embedder>,
    store: Arc<dyn VectorStoreProvider>,
    config: RetrievalConfig,
}

impl Retriever {
    pub fn new(
        embedder: Arc<Embedder>,
        store: Arc<dyn VectorStoreProvider>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            store,
            config,
        }
    }

    /// Configured number of passages per question
    pub fn default_top_k(&self) -> usize {
        self.config.top_k
    }

    /// Retrieve up to `top_k` passages, best first
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedPassage>> {
        if top_k == 0 {
            return Err(Error::validation("top_k must be greater than zero"));
        }
        if query.trim().is_empty() {
            return Err(Error::validation("query must not be empty"));
        }

        let vector = self.embedder.embed_query(query).await?;
        let matches = self.store.query(&vector, top_k, true).await?;
        let fetched = matches.len();

        let mut passages: Vec<RetrievedPassage> = matches
            .into_iter()
            .filter(|m| self.config.min_score.map_or(true, |min| m.score >= min))
            .filter_map(|m| {
                let text = m.text()?.to_string();
                let source = m.source().map(str::to_string);
                Some(RetrievedPassage {
                    id: m.id,
                    score: m.score,
                    text,
                    source,
                })
            })
            .collect();

        passages.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        passages.truncate(top_k);

        tracing::debug!(
            "Retrieved {} of {} matches for query ({} chars)",
            passages.len(),
            fetched,
            query.chars().count()
        );

        if passages.is_empty() {
            return Err(Error::NoRelevantDocuments(
                "the index returned no usable passages for this question".to_string(),
            ));
        }

        Ok(passages)
    }
}
