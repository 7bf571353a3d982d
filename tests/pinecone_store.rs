//! PineconeStore against a local mock of the control and data planes.

mod common;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use common::HashEmbedder;
use pdf_rag::config::VectorStoreConfig;
use pdf_rag::indexer::{IndexOptions, Indexer};
use pdf_rag::models::{IndexedVector, SourceDocument, VectorMetadata};
use pdf_rag::pinecone::PineconeStore;
use pdf_rag::retry::RetryPolicy;
use pdf_rag::store::{CollectionSpec, DistanceMetric, VectorStore};
use pdf_rag::RagError;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const API_KEY: &str = "test-key";

#[derive(Default)]
struct MockState {
    host: String,
    indexes: HashMap<String, Value>,
    /// Describe calls a freshly created index needs before reporting ready.
    ready_after: usize,
    describe_calls: usize,
    create_calls: usize,
    upsert_calls: usize,
    /// Caps the `upsertedCount` reported per request.
    ack_limit: Option<usize>,
    /// namespace -> (id, values, metadata)
    vectors: HashMap<String, Vec<(String, Vec<f32>, Option<Value>)>>,
}

type Shared = Arc<Mutex<MockState>>;

fn authorized(headers: &HeaderMap) -> bool {
    headers.get("Api-Key").and_then(|v| v.to_str().ok()) == Some(API_KEY)
        && headers.contains_key("X-Pinecone-API-Version")
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, "bad api key").into_response()
}

async fn list_indexes(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let s = state.lock().unwrap();
    let indexes: Vec<Value> = s.indexes.values().cloned().collect();
    Json(json!({ "indexes": indexes })).into_response()
}

async fn create_index(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut s = state.lock().unwrap();
    s.create_calls += 1;
    let name = body["name"].as_str().unwrap_or_default().to_string();
    if s.indexes.contains_key(&name) {
        return (StatusCode::CONFLICT, "exists").into_response();
    }
    let model = json!({
        "name": name,
        "dimension": body["dimension"],
        "metric": body["metric"],
        "host": s.host,
        "spec": body["spec"],
        "status": { "ready": false, "state": "Initializing" },
    });
    s.indexes.insert(name, model.clone());
    (StatusCode::CREATED, Json(model)).into_response()
}

async fn describe_index(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut s = state.lock().unwrap();
    s.describe_calls += 1;
    let ready = s.describe_calls >= s.ready_after;
    match s.indexes.get_mut(&name) {
        Some(model) => {
            if ready {
                model["status"] = json!({ "ready": true, "state": "Ready" });
            }
            Json(model.clone()).into_response()
        }
        None => (StatusCode::NOT_FOUND, "no such index").into_response(),
    }
}

async fn upsert(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut s = state.lock().unwrap();
    s.upsert_calls += 1;
    let namespace = body["namespace"].as_str().unwrap_or_default().to_string();
    let incoming = body["vectors"].as_array().cloned().unwrap_or_default();
    let count = s.ack_limit.map_or(incoming.len(), |limit| incoming.len().min(limit));
    let slot = s.vectors.entry(namespace).or_default();
    for v in incoming {
        let id = v["id"].as_str().unwrap_or_default().to_string();
        let values: Vec<f32> = serde_json::from_value(v["values"].clone()).unwrap_or_default();
        slot.retain(|(existing, _, _)| existing != &id);
        slot.push((id, values, Some(v["metadata"].clone())));
    }
    Json(json!({ "upsertedCount": count })).into_response()
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

async fn query(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let s = state.lock().unwrap();
    let namespace = body["namespace"].as_str().unwrap_or_default();
    let top_k = body["topK"].as_u64().unwrap_or(0) as usize;
    let vector: Vec<f32> = serde_json::from_value(body["vector"].clone()).unwrap_or_default();

    let mut matches: Vec<Value> = s
        .vectors
        .get(namespace)
        .map(|vs| {
            vs.iter()
                .map(|(id, values, metadata)| {
                    let mut m = json!({ "id": id, "score": cosine(&vector, values) });
                    if let Some(md) = metadata {
                        m["metadata"] = md.clone();
                    }
                    m
                })
                .collect()
        })
        .unwrap_or_default();
    matches.sort_by(|a, b| {
        let (x, y) = (a["score"].as_f64().unwrap_or(0.0), b["score"].as_f64().unwrap_or(0.0));
        y.partial_cmp(&x).unwrap_or(std::cmp::Ordering::Equal)
    });
    matches.truncate(top_k);
    Json(json!({ "matches": matches, "namespace": namespace })).into_response()
}

async fn describe_stats(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let s = state.lock().unwrap();
    let namespaces: serde_json::Map<String, Value> = s
        .vectors
        .iter()
        .map(|(ns, vs)| (ns.clone(), json!({ "vectorCount": vs.len() })))
        .collect();
    Json(json!({ "namespaces": namespaces, "dimension": 3 })).into_response()
}

/// Start the mock; the data-plane host points back at the same server.
async fn spawn_mock(ready_after: usize) -> (String, Shared) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let state: Shared = Arc::new(Mutex::new(MockState {
        host: base.clone(),
        ready_after,
        ..MockState::default()
    }));

    let app = Router::new()
        .route("/indexes", get(list_indexes).post(create_index))
        .route("/indexes/{name}", get(describe_index))
        .route("/vectors/upsert", post(upsert))
        .route("/query", post(query))
        .route("/describe_index_stats", post(describe_stats))
        .with_state(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (base, state)
}

fn store_for(base: &str, timeout: Duration) -> PineconeStore {
    let config = VectorStoreConfig {
        control_plane_url: base.to_string(),
        upsert_batch_size: 2,
        ..VectorStoreConfig::default()
    };
    PineconeStore::with_api_key(&config, API_KEY)
        .unwrap()
        .with_polling(Duration::from_millis(10), timeout)
        .with_retry(RetryPolicy::new(0))
}

fn spec(dimension: usize) -> CollectionSpec {
    CollectionSpec {
        name: "pdf-chatbot-index".to_string(),
        dimension,
        metric: DistanceMetric::Cosine,
        cloud: "aws".to_string(),
        region: "us-east-1".to_string(),
    }
}

fn vector(doc: &str, chunk_id: usize, values: Vec<f32>, text: &str) -> IndexedVector {
    IndexedVector {
        id: IndexedVector::vector_id(doc, chunk_id),
        values,
        metadata: VectorMetadata {
            text: text.to_string(),
            source: format!("{}.pdf", doc),
            doc_id: doc.to_string(),
            chunk_id,
            ingested_at: None,
        },
    }
}

#[tokio::test]
async fn test_creates_index_and_waits_until_ready() {
    let (base, state) = spawn_mock(3).await;
    let store = store_for(&base, Duration::from_secs(5));

    let handle = store.ensure_ready(&spec(3)).await.unwrap();
    assert_eq!(handle.name, "pdf-chatbot-index");
    assert_eq!(handle.dimension, 3);
    assert_eq!(handle.host, base);

    let s = state.lock().unwrap();
    assert_eq!(s.create_calls, 1);
    assert!(s.describe_calls >= 3);
}

#[tokio::test]
async fn test_second_ensure_ready_does_not_recreate() {
    let (base, state) = spawn_mock(1).await;
    let store = store_for(&base, Duration::from_secs(5));

    store.ensure_ready(&spec(3)).await.unwrap();
    store.ensure_ready(&spec(3)).await.unwrap();
    assert_eq!(state.lock().unwrap().create_calls, 1);
}

#[tokio::test]
async fn test_never_ready_times_out() {
    let (base, _state) = spawn_mock(usize::MAX).await;
    let store = store_for(&base, Duration::from_millis(100));

    let err = store.ensure_ready(&spec(3)).await.unwrap_err();
    assert!(
        matches!(err, RagError::ProvisioningTimeout { ref collection, .. } if collection == "pdf-chatbot-index"),
        "got {:?}",
        err
    );
}

#[tokio::test]
async fn test_existing_index_with_other_dimension_rejected() {
    let (base, _state) = spawn_mock(1).await;
    let store = store_for(&base, Duration::from_secs(5));

    store.ensure_ready(&spec(3)).await.unwrap();
    let err = store.ensure_ready(&spec(1536)).await.unwrap_err();
    assert!(matches!(
        err,
        RagError::DimensionMismatch {
            expected: 3,
            actual: 1536
        }
    ));
}

#[tokio::test]
async fn test_wrong_api_key_is_vector_store_error() {
    let (base, _state) = spawn_mock(1).await;
    let config = VectorStoreConfig {
        control_plane_url: base,
        ..VectorStoreConfig::default()
    };
    let store = PineconeStore::with_api_key(&config, "wrong")
        .unwrap()
        .with_retry(RetryPolicy::new(0));
    let err = store.ensure_ready(&spec(3)).await.unwrap_err();
    assert!(matches!(err, RagError::VectorStore(_)));
}

#[tokio::test]
async fn test_upsert_query_and_stats_are_namespaced() {
    let (base, state) = spawn_mock(1).await;
    let store = store_for(&base, Duration::from_secs(5));
    let handle = store.ensure_ready(&spec(3)).await.unwrap();

    let alpha = vec![
        vector("a", 0, vec![1.0, 0.0, 0.0], "alpha zero"),
        vector("a", 1, vec![0.0, 1.0, 0.0], "alpha one"),
        vector("a", 2, vec![0.7, 0.7, 0.0], "alpha two"),
    ];
    let beta = vec![vector("b", 0, vec![1.0, 0.0, 0.0], "beta zero")];

    assert_eq!(store.upsert(&handle, &alpha, "alpha").await.unwrap(), 3);
    assert_eq!(store.upsert(&handle, &beta, "beta").await.unwrap(), 1);
    assert_eq!(store.upsert(&handle, &[], "beta").await.unwrap(), 0);
    // Batches of two: alpha needs two requests, beta one, the empty call none.
    assert_eq!(state.lock().unwrap().upsert_calls, 3);

    let matches = store
        .query(&handle, &[1.0, 0.0, 0.0], "alpha", 2)
        .await
        .unwrap();
    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].id, "a-0");
    assert_eq!(matches[0].metadata.text, "alpha zero");
    assert_eq!(matches[0].metadata.chunk_id, 0);
    assert!(matches[0].score >= matches[1].score);
    assert!(matches.iter().all(|m| m.metadata.doc_id == "a"));

    let empty = store
        .query(&handle, &[1.0, 0.0, 0.0], "nobody", 5)
        .await
        .unwrap();
    assert!(empty.is_empty());

    let stats = store.namespace_stats(&handle, "alpha").await.unwrap();
    assert_eq!(stats.vector_count, 3);
    let stats = store.namespace_stats(&handle, "nobody").await.unwrap();
    assert_eq!(stats.vector_count, 0);
}

#[tokio::test]
async fn test_upsert_replaces_same_id() {
    let (base, _state) = spawn_mock(1).await;
    let store = store_for(&base, Duration::from_secs(5));
    let handle = store.ensure_ready(&spec(3)).await.unwrap();

    store
        .upsert(&handle, &[vector("a", 0, vec![1.0, 0.0, 0.0], "old")], "ns")
        .await
        .unwrap();
    store
        .upsert(&handle, &[vector("a", 0, vec![1.0, 0.0, 0.0], "new")], "ns")
        .await
        .unwrap();

    let stats = store.namespace_stats(&handle, "ns").await.unwrap();
    assert_eq!(stats.vector_count, 1);
    let matches = store.query(&handle, &[1.0, 0.0, 0.0], "ns", 5).await.unwrap();
    assert_eq!(matches[0].metadata.text, "new");
}

#[tokio::test]
async fn test_matches_without_metadata_are_skipped() {
    let (base, state) = spawn_mock(1).await;
    let store = store_for(&base, Duration::from_secs(5));
    let handle = store.ensure_ready(&spec(3)).await.unwrap();

    store
        .upsert(&handle, &[vector("a", 0, vec![0.0, 1.0, 0.0], "kept")], "ns")
        .await
        .unwrap();
    state.lock().unwrap().vectors.entry("ns".to_string()).or_default().push((
        "orphan".to_string(),
        vec![0.0, 1.0, 0.0],
        None,
    ));

    let matches = store.query(&handle, &[0.0, 1.0, 0.0], "ns", 5).await.unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].id, "a-0");
}

#[tokio::test]
async fn test_short_upsert_acknowledgement_is_an_error() {
    let (base, state) = spawn_mock(1).await;
    let store = store_for(&base, Duration::from_secs(5));
    let handle = store.ensure_ready(&spec(3)).await.unwrap();
    state.lock().unwrap().ack_limit = Some(1);

    let batch = vec![
        vector("a", 0, vec![1.0, 0.0, 0.0], "zero"),
        vector("a", 1, vec![0.0, 1.0, 0.0], "one"),
    ];
    let err = store.upsert(&handle, &batch, "ns").await.unwrap_err();
    assert!(matches!(err, RagError::VectorStore(ref msg) if msg.contains("1 of 2")), "got {:?}", err);
}

#[tokio::test]
async fn test_indexer_fails_when_nothing_is_acknowledged() {
    let (base, state) = spawn_mock(1).await;
    let store = store_for(&base, Duration::from_secs(5));
    let handle = store.ensure_ready(&spec(3)).await.unwrap();
    state.lock().unwrap().ack_limit = Some(0);

    let embedder = HashEmbedder::new(3);
    let doc = SourceDocument {
        doc_id: "fox".to_string(),
        namespace: "ns".to_string(),
        source: "fox.pdf".to_string(),
        text: "The quick brown fox jumps over the lazy dog".to_string(),
    };
    let opts = IndexOptions {
        chunk_size: 10,
        overlap: 3,
        batch_size: 4,
    };
    let result = Indexer::new(&embedder, &store, &handle).index(&doc, &opts).await;
    assert!(matches!(result, Err(RagError::VectorStore(_))), "got {:?}", result);
}
