//! Vector store provider trait and the records exchanged with it

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Similarity metric of an index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    #[default]
    Cosine,
    Euclidean,
    #[serde(rename = "dotproduct")]
    DotProduct,
}

/// Shape of the index a store must provide
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: String,
    pub dimension: usize,
    pub metric: DistanceMetric,
}

impl IndexSpec {
    /// Cosine index of the given dimension
    pub fn cosine(name: impl Into<String>, dimension: usize) -> Self {
        Self {
            name: name.into(),
            dimension,
            metric: DistanceMetric::Cosine,
        }
    }
}

/// A persisted (id, vector, payload) triple
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: serde_json::Value,
}

/// A query hit
#[derive(Debug, Clone, PartialEq)]
pub struct QueryMatch {
    pub id: String,
    /// Similarity score, higher is more similar
    pub score: f32,
    pub payload: Option<serde_json::Value>,
}

impl QueryMatch {
    /// Chunk text carried by the payload (`text`, or legacy `content`), if non-blank
    pub fn text(&self) -> Option<&str> {
        let payload = self.payload.as_ref()?;
        ["text", "content"]
            .iter()
            .filter_map(|key| payload.get(*key).and_then(|v| v.as_str()))
            .find(|t| !t.trim().is_empty())
    }

    /// Source file name, if recorded
    pub fn source(&self) -> Option<&str> {
        self.payload.as_ref()?.get("source")?.as_str()
    }
}

/// Trait for vector storage and similarity search
///
/// Implementations:
/// - `PineconeStore`: Pinecone serverless index over REST
/// - `InMemoryVectorStore`: brute-force cosine search in process memory
#[async_trait]
pub trait VectorStoreProvider: Send + Sync {
    /// Create the index if missing; an existing index must match its dimension and metric
    async fn ensure_index(&self, spec: &IndexSpec) -> Result<()>;

    /// Insert or overwrite records by id, returning how many were written
    async fn upsert(&self, records: &[IndexedRecord]) -> Result<usize>;

    /// Top-k records by descending similarity
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_payload: bool,
    ) -> Result<Vec<QueryMatch>>;

    /// Get total number of vectors stored
    async fn len(&self) -> Result<usize>;

    /// Check if store is empty
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Get provider name for logging
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_match_text_prefers_text_key() {
        let m = QueryMatch {
            id: "id-1".into(),
            score: 0.9,
            payload: Some(json!({"text": "omega-3", "content": "legacy"})),
        };
        assert_eq!(m.text(), Some("omega-3"));

        let legacy = QueryMatch {
            payload: Some(json!({"content": "legacy"})),
            ..m.clone()
        };
        assert_eq!(legacy.text(), Some("legacy"));

        let blank = QueryMatch {
            payload: Some(json!({"text": "  "})),
            ..m.clone()
        };
        assert_eq!(blank.text(), None);

        let bare = QueryMatch { payload: None, ..m };
        assert_eq!(bare.text(), None);
    }

    #[test]
    fn test_metric_wire_names() {
        assert_eq!(serde_json::to_value(DistanceMetric::Cosine).unwrap(), "cosine");
        assert_eq!(
            serde_json::to_value(DistanceMetric::DotProduct).unwrap(),
            "dotproduct"
        );
    }
}
