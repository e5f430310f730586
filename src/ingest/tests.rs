use super::*;
use crate::config::OpenAiConfig;
use crate::embeddings::batching::{BatchSize, plan_batches};
use crate::embeddings::chunking::TokenChunk;
use serde_json::json;
use std::collections::HashSet;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn make_chunks(n: usize) -> Vec<TokenChunk> {
    (0..n)
        .map(|index| TokenChunk {
            index,
            tokens: vec![index as u32, 100],
            text: format!("text {index}"),
        })
        .collect()
}

fn make_batch(start_index: usize, n: usize) -> PlannedBatch {
    PlannedBatch {
        start_index,
        chunks: (start_index..start_index + n)
            .map(|index| TokenChunk {
                index,
                tokens: vec![index as u32],
                text: format!("text {index}"),
            })
            .collect(),
    }
}

#[test]
fn records_pair_vectors_with_chunk_ids() {
    let batch = make_batch(3, 2);
    let records = batch_records("doc0", &batch, vec![vec![0.1], vec![0.2]])
        .expect("records should build");

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id, "doc0#chunk3");
    assert_eq!(records[0].metadata.text, "text 3");
    assert_eq!(records[1].id, "doc0#chunk4");
    assert_eq!(records[1].values, vec![0.2]);
}

#[test]
fn records_reject_vector_count_mismatch() {
    let batch = make_batch(0, 3);
    let result = batch_records("doc0", &batch, vec![vec![0.1]]);

    assert!(matches!(result, Err(crate::RagError::Embedding(_))));
}

/// Responds to /v1/embeddings with one vector per input, tagged by index.
struct EchoEmbeddings;

impl wiremock::Respond for EchoEmbeddings {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: serde_json::Value =
            serde_json::from_slice(&request.body).expect("request body should be JSON");
        let count = body["input"].as_array().map_or(0, Vec::len);

        let data: Vec<_> = (0..count)
            .map(|i| json!({ "embedding": [i as f32, 0.5], "index": i }))
            .collect();
        ResponseTemplate::new(200).set_body_json(json!({ "data": data }))
    }
}

async fn upsert_bodies(server: &MockServer) -> Vec<serde_json::Value> {
    server
        .received_requests()
        .await
        .expect("request recording enabled")
        .iter()
        .filter(|r| r.url.path() == "/vectors/upsert")
        .map(|r| serde_json::from_slice(&r.body).expect("upsert body should be JSON"))
        .collect()
}

async fn test_uploader(server: &MockServer, concurrency: usize) -> EmbeddingUploader {
    let openai = OpenAiClient::new(&OpenAiConfig {
        api_base: server.uri(),
        api_key: "test-key".to_string(),
        ..OpenAiConfig::default()
    })
    .expect("client should build");

    let index = crate::vector_index::IndexHandle::from_url(&server.uri(), "pc-key", "default")
        .expect("handle should build");

    EmbeddingUploader::new(openai, index, concurrency)
}

#[tokio::test]
async fn ten_chunks_at_batch_size_three_make_four_upserts() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(EchoEmbeddings)
        .expect(4)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/vectors/upsert"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "upsertedCount": 3 })))
        .expect(4)
        .mount(&server)
        .await;

    let batch_size = BatchSize::try_from(3i64).expect("valid batch size");
    let batches = plan_batches(make_chunks(10), batch_size);

    let uploader = test_uploader(&server, 1).await;
    let uploaded = uploader
        .upload("doc0", batches)
        .await
        .expect("upload should succeed");
    assert_eq!(uploaded, 10);

    let bodies = upsert_bodies(&server).await;
    let sizes: Vec<usize> = bodies
        .iter()
        .map(|b| b["vectors"].as_array().expect("vectors array").len())
        .collect();
    assert_eq!(sizes, vec![3, 3, 3, 1]);
}

#[tokio::test]
async fn chunk_ids_cover_document_exactly_once() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(EchoEmbeddings)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/vectors/upsert"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "upsertedCount": 3 })))
        .mount(&server)
        .await;

    let batch_size = BatchSize::try_from(3i64).expect("valid batch size");
    let batches = plan_batches(make_chunks(10), batch_size);

    // Concurrent batches may arrive in any order; the id set must still be exact.
    let uploader = test_uploader(&server, 4).await;
    uploader
        .upload("doc0", batches)
        .await
        .expect("upload should succeed");

    let mut ids = HashSet::new();
    for body in upsert_bodies(&server).await {
        for vector in body["vectors"].as_array().expect("vectors array") {
            let id = vector["id"].as_str().expect("id should be a string");
            assert!(ids.insert(id.to_string()), "duplicate id {id}");
        }
    }

    let expected: HashSet<String> = (0..10).map(|n| format!("doc0#chunk{n}")).collect();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn failed_batch_aborts_ingest() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let batch_size = BatchSize::try_from(3i64).expect("valid batch size");
    let batches = plan_batches(make_chunks(6), batch_size);

    let uploader = test_uploader(&server, 1).await;
    let result = uploader.upload("doc0", batches).await;

    assert!(matches!(result, Err(crate::RagError::Embedding(_))));
    assert!(upsert_bodies(&server).await.is_empty());
}
