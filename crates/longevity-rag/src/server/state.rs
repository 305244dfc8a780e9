//! Application state for the RAG server

use std::sync::Arc;

use crate::config::{RagConfig, VectorBackend};
use crate::error::Result;
use crate::generation::AnswerComposer;
use crate::providers::Providers;
use crate::retrieval::Retriever;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: RagConfig,
    /// Question answering over the index
    composer: AnswerComposer,
}

impl AppState {
    /// Create application state from configuration
    pub async fn new(config: RagConfig) -> Result<Self> {
        tracing::info!(
            "Initializing RAG application state (vector backend: {:?})...",
            config.vector_db.backend
        );

        let providers = Providers::from_config(&config)?;

        // A fresh in-memory store has no index yet; create it so queries see an empty index
        if config.vector_db.backend == VectorBackend::Memory {
            providers.store.ensure_index(&config.index_spec()).await?;
        }

        Ok(Self::from_parts(config, providers))
    }

    /// Create application state around already built providers
    pub fn from_parts(config: RagConfig, providers: Providers) -> Self {
        let retriever = Arc::new(Retriever::new(
            providers.embedder,
            providers.store,
            config.retrieval.clone(),
        ));
        let composer = AnswerComposer::new(
            retriever,
            providers.chat,
            config.generation.clone(),
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                composer,
            }),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    /// Get the answer composer
    pub fn composer(&self) -> &AnswerComposer {
        &self.inner.composer
    }
}
