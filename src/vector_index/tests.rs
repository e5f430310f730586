use super::*;
use crate::config::PineconeConfig;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(server: &MockServer) -> PineconeConfig {
    PineconeConfig {
        api_base: server.uri(),
        api_key: "pc-test-key".to_string(),
        index_name: "docrag".to_string(),
        namespace: "default".to_string(),
        ..PineconeConfig::default()
    }
}

#[tokio::test]
async fn detects_existing_index() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/indexes"))
        .and(header("Api-Key", "pc-test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "indexes": [{ "name": "other" }, { "name": "docrag" }]
        })))
        .mount(&server)
        .await;

    let client =
        VectorIndexClient::new(&test_config(&server), 1536).expect("client should build");
    assert!(client.index_exists().expect("exists check should succeed"));
}

#[tokio::test]
async fn missing_index_is_created_and_polled_until_ready() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/indexes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "indexes": [] })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/indexes"))
        .and(body_partial_json(json!({
            "name": "docrag",
            "dimension": 1536,
            "metric": "cosine",
            "spec": { "serverless": { "cloud": "aws", "region": "us-east-1" } }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "name": "docrag" })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/indexes/docrag"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "host": server.uri(),
            "status": { "ready": true }
        })))
        .mount(&server)
        .await;

    let client =
        VectorIndexClient::new(&test_config(&server), 1536).expect("client should build");
    client.ensure_index().expect("ensure should succeed");
}

#[tokio::test]
async fn existing_index_skips_creation() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/indexes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "indexes": [{ "name": "docrag" }]
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/indexes"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/indexes/docrag"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "host": server.uri(),
            "status": { "ready": true }
        })))
        .mount(&server)
        .await;

    let client =
        VectorIndexClient::new(&test_config(&server), 1536).expect("client should build");
    client.ensure_index().expect("ensure should succeed");
}

#[tokio::test]
async fn upsert_posts_records_with_namespace() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/vectors/upsert"))
        .and(body_partial_json(json!({
            "namespace": "default",
            "vectors": [
                { "id": "doc0#chunk0", "values": [0.1, 0.2], "metadata": { "text": "first" } }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "upsertedCount": 1 })))
        .expect(1)
        .mount(&server)
        .await;

    let handle = IndexHandle::from_url(&server.uri(), "pc-test-key", "default")
        .expect("handle should build");

    handle
        .upsert(&[VectorRecord {
            id: "doc0#chunk0".to_string(),
            values: vec![0.1, 0.2],
            metadata: RecordMetadata {
                text: "first".to_string(),
            },
        }])
        .expect("upsert should succeed");
}

#[tokio::test]
async fn query_returns_matches_in_service_order() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_partial_json(json!({
            "namespace": "default",
            "topK": 15,
            "includeMetadata": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "matches": [
                { "id": "doc0#chunk3", "score": 0.92, "metadata": { "text": "high" } },
                { "id": "doc1#chunk0", "score": 0.85, "metadata": { "text": "mid" } },
                { "id": "doc0#chunk1", "score": 0.60, "metadata": { "text": "low" } },
            ]
        })))
        .mount(&server)
        .await;

    let handle = IndexHandle::from_url(&server.uri(), "pc-test-key", "default")
        .expect("handle should build");

    let matches = handle
        .query(&[0.1, 0.2, 0.3], 15)
        .expect("query should succeed");

    assert_eq!(matches.len(), 3);
    assert_eq!(matches[0].id, "doc0#chunk3");
    assert_eq!(matches[2].id, "doc0#chunk1");
    assert_eq!(
        matches[1].metadata.as_ref().map(|m| m.text.as_str()),
        Some("mid")
    );
}

#[tokio::test]
async fn service_error_surfaces_as_vector_index_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/indexes"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let client =
        VectorIndexClient::new(&test_config(&server), 1536).expect("client should build");
    assert!(matches!(
        client.index_exists(),
        Err(crate::RagError::VectorIndex(_))
    ));
}
