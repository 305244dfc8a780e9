//! Pinecone vector store provider
//!
//! Control plane calls (describe/create index) go to `control_url`; data plane
//! calls (upsert, query, stats) go to the index host, which is resolved once
//! and cached.

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::config::{Secret, VectorDbConfig};
use crate::error::{Error, Result};

use super::vector_store::{DistanceMetric, IndexSpec, IndexedRecord, QueryMatch, VectorStoreProvider};

const API_VERSION: &str = "2024-07";
const READY_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Pinecone serverless index over REST
pub struct PineconeStore {
    client: Client,
    api_key: Secret,
    control_url: String,
    index_name: String,
    namespace: Option<String>,
    cloud: String,
    region: String,
    ready_timeout: Duration,
    /// Data plane host, once known
    host: RwLock<Option<String>>,
}

#[derive(Debug, Deserialize)]
struct IndexDescription {
    dimension: usize,
    metric: DistanceMetric,
    host: String,
    #[serde(default)]
    status: Option<IndexStatus>,
}

#[derive(Debug, Deserialize)]
struct IndexStatus {
    #[serde(default)]
    ready: bool,
}

#[derive(Serialize)]
struct CreateIndexRequest<'a> {
    name: &'a str,
    dimension: usize,
    metric: DistanceMetric,
    spec: ServerlessSpec<'a>,
}

#[derive(Serialize)]
struct ServerlessSpec<'a> {
    serverless: CloudRegion<'a>,
}

#[derive(Serialize)]
struct CloudRegion<'a> {
    cloud: &'a str,
    region: &'a str,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<WireVector<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Serialize)]
struct WireVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: &'a serde_json::Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<WireMatch>,
}

#[derive(Deserialize)]
struct WireMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<serde_json::Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    #[serde(default)]
    total_vector_count: usize,
    #[serde(default)]
    namespaces: HashMap<String, NamespaceStats>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NamespaceStats {
    #[serde(default)]
    vector_count: usize,
}

impl QueryResponse {
    fn into_matches(self, include_payload: bool) -> Vec<QueryMatch> {
        self.matches
            .into_iter()
            .map(|m| QueryMatch {
                id: m.id,
                score: m.score,
                payload: if include_payload { m.metadata } else { None },
            })
            .collect()
    }
}

impl PineconeStore {
    /// Create a store bound to the configured index
    pub fn new(config: &VectorDbConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            control_url: config.control_url.trim_end_matches('/').to_string(),
            index_name: config.index_name.clone(),
            namespace: config.namespace.clone(),
            cloud: config.cloud.clone(),
            region: config.region.clone(),
            ready_timeout: Duration::from_secs(config.ready_timeout_secs),
            host: RwLock::new(config.host.clone()),
        })
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("Api-Key", self.api_key.expose())
            .header("X-Pinecone-API-Version", API_VERSION)
    }

    /// Describe an index; `None` when it does not exist
    async fn describe_index(&self, name: &str) -> Result<Option<IndexDescription>> {
        let url = format!("{}/indexes/{}", self.control_url, name);
        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(|e| Error::vector_store(format!("describe index failed: {}", e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(response, "describe index").await?;
        let description = response
            .json()
            .await
            .map_err(|e| Error::vector_store(format!("invalid describe index response: {}", e)))?;
        Ok(Some(description))
    }

    async fn create_index(&self, spec: &IndexSpec) -> Result<()> {
        let url = format!("{}/indexes", self.control_url);
        let body = CreateIndexRequest {
            name: &spec.name,
            dimension: spec.dimension,
            metric: spec.metric,
            spec: ServerlessSpec {
                serverless: CloudRegion {
                    cloud: &self.cloud,
                    region: &self.region,
                },
            },
        };

        let response = self
            .authorized(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::vector_store(format!("create index failed: {}", e)))?;

        // Created concurrently by another run; verified by the caller afterwards
        if response.status() == StatusCode::CONFLICT {
            return Ok(());
        }
        check_status(response, "create index").await?;
        Ok(())
    }

    async fn wait_until_ready(&self, name: &str) -> Result<IndexDescription> {
        let deadline = Instant::now() + self.ready_timeout;
        loop {
            if let Some(description) = self.describe_index(name).await? {
                if description.status.as_ref().map(|s| s.ready).unwrap_or(true) {
                    return Ok(description);
                }
            }
            if Instant::now() >= deadline {
                return Err(Error::vector_store(format!(
                    "index '{}' not ready after {:?}",
                    name, self.ready_timeout
                )));
            }
            tracing::debug!("Waiting for index '{}' to become ready", name);
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    }

    /// Data plane base URL
    async fn data_url(&self, path: &str) -> Result<String> {
        let cached = self.host.read().clone();
        let host = match cached {
            Some(host) => host,
            None => {
                let description = self.describe_index(&self.index_name).await?.ok_or_else(|| {
                    Error::vector_store(format!("index '{}' does not exist", self.index_name))
                })?;
                *self.host.write() = Some(description.host.clone());
                description.host
            }
        };
        Ok(join_host(&host, path))
    }
}

#[async_trait]
impl VectorStoreProvider for PineconeStore {
    async fn ensure_index(&self, spec: &IndexSpec) -> Result<()> {
        let description = match self.describe_index(&spec.name).await? {
            Some(description) => {
                tracing::info!("Index '{}' already exists", spec.name);
                description
            }
            None => {
                tracing::info!(
                    "Creating index '{}' (dimension {}, metric {:?}) in {}/{}",
                    spec.name,
                    spec.dimension,
                    spec.metric,
                    self.cloud,
                    self.region
                );
                self.create_index(spec).await?;
                let description = self.wait_until_ready(&spec.name).await?;
                tracing::info!("Index '{}' created", spec.name);
                description
            }
        };

        check_compatible(spec, description.dimension, description.metric)?;
        if spec.name == self.index_name {
            *self.host.write() = Some(description.host);
        }
        Ok(())
    }

    async fn upsert(&self, records: &[IndexedRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let url = self.data_url("vectors/upsert").await?;
        let body = UpsertRequest {
            vectors: records
                .iter()
                .map(|r| WireVector {
                    id: &r.id,
                    values: &r.vector,
                    metadata: &r.payload,
                })
                .collect(),
            namespace: self.namespace.as_deref(),
        };

        let response = self
            .authorized(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::vector_store(format!("upsert failed: {}", e)))?;
        let response = check_status(response, "upsert").await?;
        let result: UpsertResponse = response
            .json()
            .await
            .map_err(|e| Error::vector_store(format!("invalid upsert response: {}", e)))?;

        tracing::debug!("Upserted {} vectors into '{}'", result.upserted_count, self.index_name);
        Ok(result.upserted_count)
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_payload: bool,
    ) -> Result<Vec<QueryMatch>> {
        let url = self.data_url("query").await?;
        let body = QueryRequest {
            vector,
            top_k,
            include_metadata: include_payload,
            include_values: false,
            namespace: self.namespace.as_deref(),
        };

        let response = self
            .authorized(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::vector_store(format!("query failed: {}", e)))?;
        let response = check_status(response, "query").await?;
        let result: QueryResponse = response
            .json()
            .await
            .map_err(|e| Error::vector_store(format!("invalid query response: {}", e)))?;

        Ok(result.into_matches(include_payload))
    }

    async fn len(&self) -> Result<usize> {
        let url = self.data_url("describe_index_stats").await?;
        let response = self
            .authorized(self.client.post(&url))
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| Error::vector_store(format!("describe index stats failed: {}", e)))?;
        let response = check_status(response, "describe index stats").await?;
        let stats: StatsResponse = response
            .json()
            .await
            .map_err(|e| Error::vector_store(format!("invalid stats response: {}", e)))?;

        Ok(match &self.namespace {
            Some(ns) => stats.namespaces.get(ns).map(|n| n.vector_count).unwrap_or(0),
            None => stats.total_vector_count,
        })
    }

    fn name(&self) -> &str {
        "pinecone"
    }
}

/// An existing index must have the configured shape
fn check_compatible(spec: &IndexSpec, dimension: usize, metric: DistanceMetric) -> Result<()> {
    if dimension != spec.dimension {
        return Err(Error::config(format!(
            "index '{}' has dimension {}, embeddings are configured for {}",
            spec.name, dimension, spec.dimension
        )));
    }
    if metric != spec.metric {
        return Err(Error::config(format!(
            "index '{}' uses metric {:?}, expected {:?}",
            spec.name, metric, spec.metric
        )));
    }
    Ok(())
}

fn join_host(host: &str, path: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        format!("{}/{}", host, path)
    } else {
        format!("https://{}/{}", host, path)
    }
}

async fn check_status(response: reqwest::Response, operation: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::error!("Pinecone {} failed: HTTP {} - {}", operation, status, body);
    Err(Error::vector_store(format!(
        "{} failed: HTTP {} - {}",
        operation, status, body
    )))
}
