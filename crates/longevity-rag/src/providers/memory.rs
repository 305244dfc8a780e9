//! In-memory vector store using brute-force cosine similarity
//!
//! Suitable for development and tests. Records live only as long as the
//! process.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::error::{Error, Result};

use super::vector_store::{DistanceMetric, IndexSpec, IndexedRecord, QueryMatch, VectorStoreProvider};

#[derive(Debug, Default)]
struct Inner {
    spec: Option<IndexSpec>,
    records: HashMap<String, IndexedRecord>,
}

/// Process-local vector store
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    inner: RwLock<Inner>,
}

impl InMemoryVectorStore {
    /// Create a new empty store without an index
    pub fn new() -> Self {
        Self::default()
    }

    /// Record ids currently stored, sorted
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.inner.read().records.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Payload text stored under `id`
    pub fn text_of(&self, id: &str) -> Option<String> {
        let inner = self.inner.read();
        let record = inner.records.get(id)?;
        record.payload.get("text")?.as_str().map(str::to_string)
    }
}

/// Cosine similarity; 0.0 when either vector has zero magnitude
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStoreProvider for InMemoryVectorStore {
    async fn ensure_index(&self, spec: &IndexSpec) -> Result<()> {
        if spec.metric != DistanceMetric::Cosine {
            return Err(Error::config(format!(
                "in-memory store only supports cosine, got {:?}",
                spec.metric
            )));
        }

        let mut inner = self.inner.write();
        if let Some(existing) = &inner.spec {
            if existing.dimension != spec.dimension {
                return Err(Error::config(format!(
                    "index '{}' has dimension {}, embeddings are configured for {}",
                    existing.name, existing.dimension, spec.dimension
                )));
            }
            return Ok(());
        }

        tracing::info!(
            "Created in-memory index '{}' (dimension {})",
            spec.name,
            spec.dimension
        );
        inner.spec = Some(spec.clone());
        Ok(())
    }

    async fn upsert(&self, records: &[IndexedRecord]) -> Result<usize> {
        let mut inner = self.inner.write();
        let dimension = inner
            .spec
            .as_ref()
            .map(|s| s.dimension)
            .ok_or_else(|| Error::vector_store("index does not exist"))?;

        if let Some(bad) = records.iter().find(|r| r.vector.len() != dimension) {
            return Err(Error::vector_store(format!(
                "record '{}' has {} dimensions, index expects {}",
                bad.id,
                bad.vector.len(),
                dimension
            )));
        }

        for record in records {
            inner.records.insert(record.id.clone(), record.clone());
        }
        Ok(records.len())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_payload: bool,
    ) -> Result<Vec<QueryMatch>> {
        let inner = self.inner.read();
        let spec = inner
            .spec
            .as_ref()
            .ok_or_else(|| Error::vector_store("index does not exist"))?;
        if vector.len() != spec.dimension {
            return Err(Error::config(format!(
                "query vector has {} dimensions, index expects {}",
                vector.len(),
                spec.dimension
            )));
        }

        let mut matches: Vec<QueryMatch> = inner
            .records
            .values()
            .map(|record| QueryMatch {
                id: record.id.clone(),
                score: cosine_similarity(&record.vector, vector),
                payload: include_payload.then(|| record.payload.clone()),
            })
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        matches.truncate(top_k);
        Ok(matches)
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.inner.read().records.len())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str, vector: Vec<f32>, text: &str) -> IndexedRecord {
        IndexedRecord {
            id: id.to_string(),
            vector,
            payload: json!({ "text": text }),
        }
    }

    #[tokio::test]
    async fn test_ensure_index_is_idempotent() {
        let store = InMemoryVectorStore::new();
        let spec = IndexSpec::cosine("nutrition", 3);
        store.ensure_index(&spec).await.unwrap();
        store.ensure_index(&spec).await.unwrap();

        let err = store
            .ensure_index(&IndexSpec::cosine("nutrition", 4))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_upsert_overwrites_by_id() {
        let store = InMemoryVectorStore::new();
        store.ensure_index(&IndexSpec::cosine("n", 2)).await.unwrap();
        store
            .upsert(&[record("id-1", vec![1.0, 0.0], "old")])
            .await
            .unwrap();
        store
            .upsert(&[record("id-1", vec![0.0, 1.0], "new")])
            .await
            .unwrap();

        assert_eq!(store.len().await.unwrap(), 1);
        assert_eq!(store.text_of("id-1").as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_upsert_without_index_fails() {
        let store = InMemoryVectorStore::new();
        let err = store
            .upsert(&[record("id-1", vec![1.0], "x")])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::VectorStore(_)));
    }

    #[tokio::test]
    async fn test_query_orders_by_score() {
        let store = InMemoryVectorStore::new();
        store.ensure_index(&IndexSpec::cosine("n", 2)).await.unwrap();
        store
            .upsert(&[
                record("id-1", vec![1.0, 0.0], "a"),
                record("id-2", vec![0.7, 0.7], "b"),
                record("id-3", vec![0.0, 1.0], "c"),
            ])
            .await
            .unwrap();

        let matches = store.query(&[1.0, 0.1], 2, true).await.unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].id, "id-1");
        assert_eq!(matches[1].id, "id-2");
        assert!(matches[0].score >= matches[1].score);
        assert_eq!(matches[0].text(), Some("a"));

        let bare = store.query(&[1.0, 0.1], 1, false).await.unwrap();
        assert!(bare[0].payload.is_none());
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
