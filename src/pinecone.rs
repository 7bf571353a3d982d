//! Pinecone-backed [`VectorStore`].
//!
//! Talks to two REST surfaces:
//!
//! | Plane | Endpoint | Used by |
//! |-------|----------|---------|
//! | control | `GET /indexes` | [`ensure_ready`](VectorStore::ensure_ready) |
//! | control | `POST /indexes` | [`ensure_ready`](VectorStore::ensure_ready) |
//! | control | `GET /indexes/{name}` | readiness polling |
//! | data | `POST {host}/vectors/upsert` | [`upsert`](VectorStore::upsert) |
//! | data | `POST {host}/query` | [`query`](VectorStore::query) |
//! | data | `POST {host}/describe_index_stats` | [`namespace_stats`](VectorStore::namespace_stats) |
//!
//! The data-plane host is discovered from the index description, so the
//! [`CollectionHandle`] returned by `ensure_ready` is required for every
//! later call. Requests go through the shared [`RetryPolicy`].

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use pdf_rag_core::models::{IndexedVector, ScoredVector, VectorMetadata};
use pdf_rag_core::store::{
    CollectionHandle, CollectionSpec, DistanceMetric, NamespaceStats, VectorStore,
};
use pdf_rag_core::RagError;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::VectorStoreConfig;
use crate::retry::{HttpError, RetryPolicy};

pub const PINECONE_API_KEY_ENV: &str = "PINECONE_API_KEY";
const API_VERSION: &str = "2024-07";

// ============ Wire types ============

#[derive(Debug, Deserialize)]
struct IndexList {
    #[serde(default)]
    indexes: Vec<IndexModel>,
}

#[derive(Debug, Deserialize)]
struct IndexModel {
    name: String,
    dimension: usize,
    #[serde(default)]
    metric: DistanceMetric,
    #[serde(default)]
    host: String,
    #[serde(default)]
    status: IndexStatus,
}

#[derive(Debug, Deserialize, Default)]
struct IndexStatus {
    #[serde(default)]
    ready: bool,
    #[serde(default)]
    state: String,
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
    namespace: &'a str,
}

#[derive(Serialize)]
struct WireVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: &'a VectorMetadata,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    upserted_count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    namespace: &'a str,
    include_metadata: bool,
    include_values: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<WireMatch>,
}

#[derive(Deserialize)]
struct WireMatch {
    id: String,
    score: f32,
    #[serde(default)]
    metadata: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct IndexStats {
    #[serde(default)]
    namespaces: HashMap<String, NamespaceSummary>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NamespaceSummary {
    #[serde(default)]
    vector_count: u64,
}

// ============ Store ============

pub struct PineconeStore {
    client: reqwest::Client,
    api_key: String,
    control_url: String,
    retry: RetryPolicy,
    poll_interval: Duration,
    ready_timeout: Duration,
    upsert_batch_size: usize,
}

impl PineconeStore {
    /// Build from config, reading the key from `PINECONE_API_KEY`.
    pub fn new(config: &VectorStoreConfig) -> Result<Self> {
        let api_key = std::env::var(PINECONE_API_KEY_ENV)
            .with_context(|| format!("{} environment variable not set", PINECONE_API_KEY_ENV))?;
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: &VectorStoreConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            control_url: config.control_plane_url.trim_end_matches('/').to_string(),
            retry: RetryPolicy::new(config.max_retries),
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            ready_timeout: Duration::from_secs(config.ready_timeout_secs),
            upsert_batch_size: config.upsert_batch_size.max(1),
        })
    }

    /// Override readiness polling, e.g. for sub-second intervals.
    pub fn with_polling(mut self, poll_interval: Duration, ready_timeout: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.ready_timeout = ready_timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
    }

    fn data_url(handle: &CollectionHandle, path: &str) -> String {
        let host = handle.host.trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            format!("{}{}", host, path)
        } else {
            format!("https://{}{}", host, path)
        }
    }

    async fn list_indexes(&self) -> pdf_rag_core::Result<Vec<IndexModel>> {
        let url = format!("{}/indexes", self.control_url);
        let resp = self
            .retry
            .send("pinecone list indexes", || {
                self.request(reqwest::Method::GET, &url)
            })
            .await
            .map_err(store_error)?;
        let list: IndexList = resp.json().await.map_err(decode_error)?;
        Ok(list.indexes)
    }

    async fn create_index(&self, spec: &CollectionSpec) -> pdf_rag_core::Result<()> {
        let url = format!("{}/indexes", self.control_url);
        let body = CreateIndexRequest {
            name: &spec.name,
            dimension: spec.dimension,
            metric: spec.metric,
            spec: ServerlessSpec {
                serverless: CloudRegion {
                    cloud: &spec.cloud,
                    region: &spec.region,
                },
            },
        };
        let result = self
            .retry
            .send("pinecone create index", || {
                self.request(reqwest::Method::POST, &url).json(&body)
            })
            .await;
        match result {
            Ok(_) => {
                info!(index = %spec.name, dimension = spec.dimension, "created index");
                Ok(())
            }
            // Another process created it between our list and create.
            Err(e) if e.status() == Some(StatusCode::CONFLICT) => Ok(()),
            Err(e) => Err(store_error(e)),
        }
    }

    async fn describe_index(&self, name: &str) -> pdf_rag_core::Result<IndexModel> {
        let url = format!("{}/indexes/{}", self.control_url, name);
        let resp = self
            .retry
            .send("pinecone describe index", || {
                self.request(reqwest::Method::GET, &url)
            })
            .await
            .map_err(store_error)?;
        resp.json().await.map_err(decode_error)
    }

    async fn wait_until_ready(&self, name: &str) -> pdf_rag_core::Result<IndexModel> {
        let started = tokio::time::Instant::now();
        loop {
            let index = self.describe_index(name).await?;
            if index.status.ready && !index.host.is_empty() {
                info!(
                    index = %name,
                    host = %index.host,
                    waited_ms = started.elapsed().as_millis() as u64,
                    "index ready"
                );
                return Ok(index);
            }
            if started.elapsed() >= self.ready_timeout {
                return Err(RagError::ProvisioningTimeout {
                    collection: name.to_string(),
                    waited_secs: self.ready_timeout.as_secs(),
                });
            }
            debug!(index = %name, state = %index.status.state, "index not ready yet");
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

fn store_error(err: HttpError) -> RagError {
    RagError::VectorStore(err.to_string())
}

fn decode_error(err: reqwest::Error) -> RagError {
    RagError::VectorStore(format!("invalid response: {}", err))
}

#[async_trait]
impl VectorStore for PineconeStore {
    async fn ensure_ready(&self, spec: &CollectionSpec) -> pdf_rag_core::Result<CollectionHandle> {
        let existing = self
            .list_indexes()
            .await?
            .into_iter()
            .find(|i| i.name == spec.name);

        match existing {
            Some(index) if index.dimension != spec.dimension => {
                return Err(RagError::DimensionMismatch {
                    expected: index.dimension,
                    actual: spec.dimension,
                });
            }
            Some(_) => debug!(index = %spec.name, "index exists"),
            None => self.create_index(spec).await?,
        }

        let index = self.wait_until_ready(&spec.name).await?;
        if index.dimension != spec.dimension {
            return Err(RagError::DimensionMismatch {
                expected: index.dimension,
                actual: spec.dimension,
            });
        }
        Ok(CollectionHandle {
            name: index.name,
            host: index.host,
            dimension: index.dimension,
            metric: index.metric,
        })
    }

    async fn upsert(
        &self,
        handle: &CollectionHandle,
        vectors: &[IndexedVector],
        namespace: &str,
    ) -> pdf_rag_core::Result<usize> {
        if vectors.is_empty() {
            return Ok(0);
        }
        let url = Self::data_url(handle, "/vectors/upsert");
        let mut written = 0;
        for batch in vectors.chunks(self.upsert_batch_size) {
            let body = UpsertRequest {
                vectors: batch
                    .iter()
                    .map(|v| WireVector {
                        id: &v.id,
                        values: &v.values,
                        metadata: &v.metadata,
                    })
                    .collect(),
                namespace,
            };
            let resp = self
                .retry
                .send("pinecone upsert", || {
                    self.request(reqwest::Method::POST, &url).json(&body)
                })
                .await
                .map_err(store_error)?;
            let parsed: UpsertResponse = resp.json().await.map_err(decode_error)?;
            if parsed.upserted_count != batch.len() {
                return Err(RagError::VectorStore(format!(
                    "upsert acknowledged {} of {} vectors",
                    parsed.upserted_count,
                    batch.len()
                )));
            }
            written += parsed.upserted_count;
        }
        debug!(namespace = %namespace, vectors = written, "upserted vectors");
        Ok(written)
    }

    async fn query(
        &self,
        handle: &CollectionHandle,
        vector: &[f32],
        namespace: &str,
        top_k: usize,
    ) -> pdf_rag_core::Result<Vec<ScoredVector>> {
        let url = Self::data_url(handle, "/query");
        let body = QueryRequest {
            vector,
            top_k,
            namespace,
            include_metadata: true,
            include_values: false,
        };
        let resp = self
            .retry
            .send("pinecone query", || {
                self.request(reqwest::Method::POST, &url).json(&body)
            })
            .await
            .map_err(store_error)?;
        let parsed: QueryResponse = resp.json().await.map_err(decode_error)?;

        let mut matches: Vec<ScoredVector> = parsed
            .matches
            .into_iter()
            .filter_map(|m| {
                let metadata = m
                    .metadata
                    .and_then(|raw| serde_json::from_value::<VectorMetadata>(raw).ok());
                match metadata {
                    Some(metadata) => Some(ScoredVector {
                        id: m.id,
                        score: m.score,
                        metadata,
                    }),
                    None => {
                        warn!(id = %m.id, "skipping match without usable metadata");
                        None
                    }
                }
            })
            .collect();
        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(top_k);
        Ok(matches)
    }

    async fn namespace_stats(
        &self,
        handle: &CollectionHandle,
        namespace: &str,
    ) -> pdf_rag_core::Result<NamespaceStats> {
        let url = Self::data_url(handle, "/describe_index_stats");
        let resp = self
            .retry
            .send("pinecone describe stats", || {
                self.request(reqwest::Method::POST, &url)
                    .json(&serde_json::json!({}))
            })
            .await
            .map_err(store_error)?;
        let stats: IndexStats = resp.json().await.map_err(decode_error)?;
        Ok(NamespaceStats {
            namespace: namespace.to_string(),
            vector_count: stats
                .namespaces
                .get(namespace)
                .map(|n| n.vector_count)
                .unwrap_or(0),
        })
    }
}
