//! In-memory [`VectorStore`] implementation for tests and offline use.
//!
//! Collections live in a `HashMap` behind `std::sync::RwLock`. Each
//! namespace is an ordered map from vector id to vector, so re-upserting
//! an id replaces it. Queries are brute-force over one namespace.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::error::{RagError, Result};
use crate::models::{IndexedVector, ScoredVector};

use super::{CollectionHandle, CollectionSpec, DistanceMetric, NamespaceStats, VectorStore};

struct MemoryCollection {
    dimension: usize,
    metric: DistanceMetric,
    namespaces: HashMap<String, BTreeMap<String, IndexedVector>>,
}

/// In-memory vector store.
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, MemoryCollection>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, MemoryCollection>>> {
        self.collections
            .read()
            .map_err(|_| RagError::VectorStore("in-memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, MemoryCollection>>> {
        self.collections
            .write()
            .map_err(|_| RagError::VectorStore("in-memory store lock poisoned".to_string()))
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

fn missing(name: &str) -> RagError {
    RagError::VectorStore(format!("collection '{}' does not exist", name))
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn ensure_ready(&self, spec: &CollectionSpec) -> Result<CollectionHandle> {
        let mut collections = self.write()?;
        let collection = collections
            .entry(spec.name.clone())
            .or_insert_with(|| MemoryCollection {
                dimension: spec.dimension,
                metric: spec.metric,
                namespaces: HashMap::new(),
            });
        if collection.dimension != spec.dimension {
            return Err(RagError::DimensionMismatch {
                expected: collection.dimension,
                actual: spec.dimension,
            });
        }
        Ok(CollectionHandle {
            name: spec.name.clone(),
            host: String::new(),
            dimension: collection.dimension,
            metric: collection.metric,
        })
    }

    async fn upsert(
        &self,
        handle: &CollectionHandle,
        vectors: &[IndexedVector],
        namespace: &str,
    ) -> Result<usize> {
        if vectors.is_empty() {
            return Ok(0);
        }
        let mut collections = self.write()?;
        let collection = collections
            .get_mut(&handle.name)
            .ok_or_else(|| missing(&handle.name))?;
        if let Some(bad) = vectors.iter().find(|v| v.values.len() != collection.dimension) {
            return Err(RagError::VectorStore(format!(
                "vector '{}' has dimension {}, collection expects {}",
                bad.id,
                bad.values.len(),
                collection.dimension
            )));
        }
        let ns = collection
            .namespaces
            .entry(namespace.to_string())
            .or_default();
        for v in vectors {
            ns.insert(v.id.clone(), v.clone());
        }
        Ok(vectors.len())
    }

    async fn query(
        &self,
        handle: &CollectionHandle,
        vector: &[f32],
        namespace: &str,
        top_k: usize,
    ) -> Result<Vec<ScoredVector>> {
        let collections = self.read()?;
        let collection = collections
            .get(&handle.name)
            .ok_or_else(|| missing(&handle.name))?;
        let Some(ns) = collection.namespaces.get(namespace) else {
            return Ok(Vec::new());
        };

        let mut matches: Vec<ScoredVector> = ns
            .values()
            .map(|v| ScoredVector {
                id: v.id.clone(),
                score: collection.metric.score(vector, &v.values),
                metadata: v.metadata.clone(),
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
    ) -> Result<NamespaceStats> {
        let collections = self.read()?;
        let collection = collections
            .get(&handle.name)
            .ok_or_else(|| missing(&handle.name))?;
        let count = collection
            .namespaces
            .get(namespace)
            .map(|ns| ns.len() as u64)
            .unwrap_or(0);
        Ok(NamespaceStats {
            namespace: namespace.to_string(),
            vector_count: count,
        })
    }
}
