//! Provider abstractions for embeddings, chat completion and vector storage
//!
//! Provider response shapes are converted into the boundary types defined
//! here (`EmbeddingResult`, `QueryMatch`) as soon as they are received.

pub mod embedding;
pub mod llm;
pub mod memory;
pub mod openai;
pub mod pinecone;
pub mod vector_store;

pub use embedding::{Embedder, EmbeddingProvider, EmbeddingResult};
pub use llm::{ChatMessage, ChatProvider, ChatRequest, ChatRole};
pub use memory::InMemoryVectorStore;
pub use openai::{OpenAiChat, OpenAiClient, OpenAiEmbedder};
pub use pinecone::PineconeStore;
pub use vector_store::{DistanceMetric, IndexSpec, IndexedRecord, QueryMatch, VectorStoreProvider};

use std::sync::Arc;

use crate::config::{RagConfig, VectorBackend};
use crate::error::Result;

/// Provider clients shared by ingestion and query handling
#[derive(Clone)]
pub struct Providers {
    pub embedder: Arc<Embedder>,
    pub chat: Arc<dyn ChatProvider>,
    pub store: Arc<dyn VectorStoreProvider>,
}

impl Providers {
    /// Build the OpenAI clients and the configured vector store
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        let client = Arc::new(OpenAiClient::new(&config.openai)?);
        let provider = OpenAiEmbedder::new(
            client.clone(),
            config.embeddings.model.clone(),
            config.embeddings.dimensions,
        );
        let embedder = Embedder::new(Arc::new(provider), config.embeddings.dimensions)?;

        let store: Arc<dyn VectorStoreProvider> = match config.vector_db.backend {
            VectorBackend::Pinecone => Arc::new(PineconeStore::new(&config.vector_db)?),
            VectorBackend::Memory => Arc::new(InMemoryVectorStore::new()),
        };

        tracing::info!(
            "Providers ready: embeddings {} ({} dims), chat {}, vector store {}",
            embedder.model(),
            embedder.dimensions(),
            config.generation.model,
            store.name()
        );

        Ok(Self {
            embedder: Arc::new(embedder),
            chat: Arc::new(OpenAiChat::new(client)),
            store,
        })
    }
}
