//! Vector store abstraction.
//!
//! The [`VectorStore`] trait covers everything the pipeline needs from a
//! managed vector database: provisioning a collection, upserting vectors
//! into a namespace, nearest-neighbour queries, and namespace statistics.
//!
//! Namespaces partition a collection. A query against namespace `A` never
//! returns vectors upserted under namespace `B`. Namespaces are created
//! implicitly by the first upsert; querying an unknown namespace yields an
//! empty result, not an error.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::embedding::{cosine_similarity, dot_product, euclidean_distance};
use crate::error::Result;
use crate::models::{IndexedVector, ScoredVector};

/// Similarity metric a collection is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    #[default]
    Cosine,
    Euclidean,
    Dotproduct,
}

impl DistanceMetric {
    /// Score `b` against `a` so that higher always means more similar.
    pub fn score(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::Cosine => cosine_similarity(a, b),
            DistanceMetric::Dotproduct => dot_product(a, b),
            DistanceMetric::Euclidean => -euclidean_distance(a, b),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::Euclidean => "euclidean",
            DistanceMetric::Dotproduct => "dotproduct",
        }
    }
}

impl std::str::FromStr for DistanceMetric {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "cosine" => Ok(DistanceMetric::Cosine),
            "euclidean" => Ok(DistanceMetric::Euclidean),
            "dotproduct" => Ok(DistanceMetric::Dotproduct),
            other => Err(format!(
                "unknown metric '{}': must be cosine, euclidean, or dotproduct",
                other
            )),
        }
    }
}

/// What to provision.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSpec {
    pub name: String,
    pub dimension: usize,
    pub metric: DistanceMetric,
    pub cloud: String,
    pub region: String,
}

/// A provisioned, ready collection.
///
/// Obtained once from [`VectorStore::ensure_ready`] and passed to every
/// later call.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionHandle {
    pub name: String,
    /// Data-plane address. Empty for in-process stores.
    pub host: String,
    pub dimension: usize,
    pub metric: DistanceMetric,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceStats {
    pub namespace: String,
    pub vector_count: u64,
}

/// Abstract vector database.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`ensure_ready`](VectorStore::ensure_ready) | Create the collection if absent, wait until ready |
/// | [`upsert`](VectorStore::upsert) | Insert or replace vectors in a namespace |
/// | [`query`](VectorStore::query) | Top-K nearest neighbours within a namespace |
/// | [`namespace_stats`](VectorStore::namespace_stats) | Vector count for a namespace |
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Idempotently provision the collection and wait until it is ready.
    ///
    /// Fails with `DimensionMismatch` if a collection with the same name
    /// already exists at a different dimension, and with
    /// `ProvisioningTimeout` if it never becomes ready.
    async fn ensure_ready(&self, spec: &CollectionSpec) -> Result<CollectionHandle>;

    /// Insert or replace `vectors` under `namespace`, returning how many
    /// were written. An empty slice is a no-op.
    async fn upsert(
        &self,
        handle: &CollectionHandle,
        vectors: &[IndexedVector],
        namespace: &str,
    ) -> Result<usize>;

    /// Return at most `top_k` matches sorted by descending score.
    async fn query(
        &self,
        handle: &CollectionHandle,
        vector: &[f32],
        namespace: &str,
        top_k: usize,
    ) -> Result<Vec<ScoredVector>>;

    async fn namespace_stats(
        &self,
        handle: &CollectionHandle,
        namespace: &str,
    ) -> Result<NamespaceStats>;
}
