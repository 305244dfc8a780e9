//! Shared fakes for integration tests
#![allow(dead_code)]

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use longevity_rag::config::RagConfig;
use longevity_rag::ingestion::{Indexer, IndexerSettings, RecursiveChunker};
use longevity_rag::providers::{
    ChatProvider, ChatRequest, Embedder, EmbeddingProvider, EmbeddingResult, IndexSpec,
    InMemoryVectorStore, Providers, VectorStoreProvider,
};
use longevity_rag::{Error, Result};
use parking_lot::Mutex;

pub const DIMS: usize = 64;

pub const PROTEIN_TEXT: &str = "Protein intake for adults is 0.8g/kg/day.";

/// Bag-of-words embedder: each lowercase token is hashed onto one axis
pub struct HashingEmbedder {
    calls: AtomicUsize,
    /// 1-based call numbers that fail
    fail_on: Vec<usize>,
}

impl HashingEmbedder {
    pub fn new() -> Self {
        Self::failing_on(Vec::new())
    }

    pub fn failing_on(fail_on: Vec<usize>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_on,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn vector(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; DIMS];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            token.to_lowercase().hash(&mut hasher);
            vector[(hasher.finish() % DIMS as u64) as usize] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<EmbeddingResult> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on.contains(&call) {
            return Err(Error::embedding("upstream returned 503"));
        }
        Ok(EmbeddingResult {
            vectors: texts.iter().map(|t| Self::vector(t)).collect(),
        })
    }

    fn dimensions(&self) -> usize {
        DIMS
    }

    fn model(&self) -> &str {
        "hashing"
    }

    fn max_batch_size(&self) -> usize {
        64
    }

    fn name(&self) -> &str {
        "hashing"
    }
}

/// Chat fake that answers with the user prompt it received
pub struct EchoChat {
    pub requests: Mutex<Vec<ChatRequest>>,
    fail: bool,
}

impl EchoChat {
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            fail: true,
        }
    }
}

#[async_trait]
impl ChatProvider for EchoChat {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        self.requests.lock().push(request.clone());
        if self.fail {
            return Err(Error::llm("upstream returned 429"));
        }
        let prompt = request
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        Ok(format!("According to the knowledge base: {}", prompt))
    }

    fn name(&self) -> &str {
        "echo"
    }
}

pub fn test_config() -> RagConfig {
    let mut config = RagConfig::default();
    config.embeddings.dimensions = DIMS;
    config.vector_db.index_name = "test-index".to_string();
    config
}

pub fn embedder(provider: HashingEmbedder) -> Arc<Embedder> {
    Arc::new(Embedder::new(Arc::new(provider), DIMS).unwrap())
}

pub fn indexer(
    embedder: Arc<Embedder>,
    store: Arc<InMemoryVectorStore>,
    chunk_size: usize,
    overlap: usize,
    batch_size: usize,
) -> Indexer {
    Indexer::new(
        RecursiveChunker::new(chunk_size, overlap).unwrap(),
        embedder,
        store,
        IndexerSettings {
            index: IndexSpec::cosine("test-index", DIMS),
            batch_size,
            recursive: false,
        },
    )
    .unwrap()
}

pub fn providers(store: Arc<InMemoryVectorStore>, chat: Arc<EchoChat>) -> Providers {
    Providers {
        embedder: embedder(HashingEmbedder::new()),
        chat,
        store,
    }
}

/// A store with the test index created and nothing in it
pub async fn empty_store() -> Arc<InMemoryVectorStore> {
    let store = Arc::new(InMemoryVectorStore::new());
    store
        .ensure_index(&IndexSpec::cosine("test-index", DIMS))
        .await
        .unwrap();
    store
}

pub fn write_file(dir: &Path, name: &str, contents: &str) {
    std::fs::write(dir.join(name), contents).unwrap();
}

/// A few paragraphs of nutrition text, long enough for several small chunks
pub fn nutrition_corpus() -> String {
    [
        "Protein supports muscle repair. Adults need about 0.8 grams per kilogram of body weight each day.",
        "Fiber from legumes, whole grains and vegetables supports digestion and a healthy microbiome.",
        "Omega-3 fatty acids from oily fish, walnuts and flax seeds support heart and brain health.",
        "Hydration matters: water needs rise with heat, altitude and physical activity.",
    ]
    .join("\n\n")
}
