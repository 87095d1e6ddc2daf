//! Tests for the OpenAI-compatible embedding client against a local fake endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
};
use ragline_core::{EmbeddingProvider, OpenAIEmbeddingProvider, RagError};
use serde_json::{Value, json};

type Seen = Arc<Mutex<Vec<(Option<String>, Value)>>>;

/// Answers each input `i` with `[i, len(text)]`, listing the items in reverse.
async fn reverse_embeddings(
    State(seen): State<Seen>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    let auth = headers.get("authorization").and_then(|v| v.to_str().ok()).map(str::to_string);
    let inputs: Vec<String> = body["input"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect();
    seen.lock().unwrap().push((auth, body));

    let data: Vec<Value> = inputs
        .iter()
        .enumerate()
        .rev()
        .map(|(i, text)| json!({"index": i, "embedding": [i as f32, text.len() as f32]}))
        .collect();
    Json(json!({"object": "list", "data": data}))
}

/// Serves [`reverse_embeddings`] under a `/v1/` base URL.
async fn spawn_reversing() -> (String, Seen, tokio::task::JoinHandle<()>) {
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/v1/embeddings", post(reverse_embeddings))
        .with_state(seen.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/v1/"), seen, handle)
}

async fn spawn_fixed(status: StatusCode, reply: Value) -> (String, tokio::task::JoinHandle<()>) {
    let respond = move || async move { (status, Json(reply)) };
    let app = Router::new().route("/embeddings", post(respond));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), handle)
}

#[tokio::test]
async fn out_of_order_response_is_returned_in_input_order() {
    let (base_url, seen, handle) = spawn_reversing().await;
    let provider = OpenAIEmbeddingProvider::new("sk-test")
        .unwrap()
        .with_base_url(base_url)
        .with_model("nomic-embed-text")
        .with_dimensions(2);

    let vectors = provider.embed_batch(&["a", "bbb", "cc"]).await.unwrap();
    assert_eq!(vectors, vec![vec![0.0, 1.0], vec![1.0, 3.0], vec![2.0, 2.0]]);
    assert_eq!(provider.dimensions(), 2);
    assert_eq!(provider.model_name(), "nomic-embed-text");

    let requests = seen.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let (auth, body) = &requests[0];
    assert_eq!(auth.as_deref(), Some("Bearer sk-test"));
    assert_eq!(body["model"], "nomic-embed-text");
    assert_eq!(body["dimensions"], 2);
    assert_eq!(body["input"], json!(["a", "bbb", "cc"]));

    handle.abort();
}

#[tokio::test]
async fn single_text_uses_the_same_endpoint() {
    let (base_url, seen, handle) = spawn_reversing().await;
    let provider = OpenAIEmbeddingProvider::new("sk-test").unwrap().with_base_url(base_url);

    assert_eq!(provider.embed("soil").await.unwrap(), vec![0.0, 4.0]);
    let requests = seen.lock().unwrap();
    assert!(requests[0].1.get("dimensions").is_none());

    handle.abort();
}

#[tokio::test]
async fn count_mismatch_is_an_embedding_error() {
    let (base_url, handle) = spawn_fixed(
        StatusCode::OK,
        json!({"data": [{"index": 0, "embedding": [1.0, 0.0]}]}),
    )
    .await;
    let provider = OpenAIEmbeddingProvider::new("sk-test").unwrap().with_base_url(base_url);

    let err = provider.embed_batch(&["one", "two"]).await.unwrap_err();
    match err {
        RagError::Embedding { provider, message } => {
            assert_eq!(provider, "openai");
            assert_eq!(message, "expected 2 embeddings, got 1");
        }
        other => panic!("unexpected error {other:?}"),
    }

    handle.abort();
}

#[tokio::test]
async fn api_error_message_is_surfaced() {
    let (base_url, handle) = spawn_fixed(
        StatusCode::UNAUTHORIZED,
        json!({"error": {"message": "Incorrect API key provided", "type": "auth_error"}}),
    )
    .await;
    let provider = OpenAIEmbeddingProvider::new("sk-wrong").unwrap().with_base_url(base_url);

    let err = provider.embed("anything").await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("401"), "{message}");
    assert!(message.contains("Incorrect API key provided"), "{message}");

    handle.abort();
}

#[tokio::test]
async fn empty_batch_makes_no_request() {
    let provider = OpenAIEmbeddingProvider::new("sk-test")
        .unwrap()
        .with_base_url("http://127.0.0.1:9");
    assert!(provider.embed_batch(&[]).await.unwrap().is_empty());
}
