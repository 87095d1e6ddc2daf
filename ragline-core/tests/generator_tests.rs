//! Tests for the OpenAI-compatible chat client against a local fake endpoint.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use ragline_core::{
    Chunk, GenerationConfig, GeneratedAnswer, Generator, RetrievedDocument,
};
use serde_json::{Value, json};

type Seen = Arc<Mutex<Vec<Value>>>;

type Fake = (String, Seen, tokio::task::JoinHandle<()>);

async fn spawn_fake(status: StatusCode, reply: Value) -> Fake {
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route(
            "/chat/completions",
            post(
                |State((seen, status, reply)): State<(Seen, StatusCode, Value)>,
                 Json(body): Json<Value>| async move {
                    seen.lock().unwrap().push(body);
                    (status, Json(reply))
                },
            ),
        )
        .with_state((seen.clone(), status, reply));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), seen, handle)
}

fn config(base_url: String) -> GenerationConfig {
    GenerationConfig {
        api_key: Some("test-key".to_string()),
        base_url,
        timeout: Duration::from_secs(5),
        ..GenerationConfig::default()
    }
}

fn context() -> Vec<RetrievedDocument> {
    let chunk = Chunk::new("Cover crops reduce erosion.", "soil.txt", 0);
    vec![RetrievedDocument { chunk, score: 0.8 }]
}

#[tokio::test]
async fn returns_first_choice_content() {
    let (base_url, seen, handle) = spawn_fake(
        StatusCode::OK,
        json!({"choices": [{"message": {"role": "assistant", "content": "Plant cover crops."}}]}),
    )
    .await;

    let generator = Generator::from_config(&config(base_url)).unwrap();
    assert!(generator.is_enabled());
    let answer = generator.generate("How do I stop erosion?", &context()).await;
    assert_eq!(answer, GeneratedAnswer::Text("Plant cover crops.".to_string()));

    let requests = seen.lock().unwrap();
    let request = &requests[0];
    assert_eq!(request["model"], "llama-3.1-8b-instant");
    assert_eq!(request["max_tokens"], 1000);
    assert_eq!(request["messages"][0]["role"], "system");
    let prompt = request["messages"][1]["content"].as_str().unwrap();
    assert!(prompt.contains("[Document 1 from soil.txt]\nCover crops reduce erosion."));
    assert!(prompt.contains("Question: How do I stop erosion?"));

    handle.abort();
}

#[tokio::test]
async fn api_errors_become_failed_answers() {
    let (base_url, _seen, handle) =
        spawn_fake(StatusCode::UNAUTHORIZED, json!({"error": {"message": "Invalid API Key"}}))
            .await;

    let answer = Generator::from_config(&config(base_url)).unwrap().generate("q", &context()).await;
    match &answer {
        GeneratedAnswer::Failed(reason) => assert!(reason.contains("Invalid API Key"), "{reason}"),
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(answer.to_string().starts_with("Error generating answer: "));

    handle.abort();
}

#[tokio::test]
async fn empty_choices_become_failed_answers() {
    let (base_url, _seen, handle) = spawn_fake(StatusCode::OK, json!({"choices": []})).await;

    let answer = Generator::from_config(&config(base_url)).unwrap().generate("q", &context()).await;
    assert!(matches!(answer, GeneratedAnswer::Failed(_)));

    handle.abort();
}

#[tokio::test]
async fn unreachable_endpoint_becomes_failed_answer() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let generator = Generator::from_config(&config(format!("http://{addr}"))).unwrap();
    let answer = generator.generate("q", &[]).await;
    assert!(matches!(answer, GeneratedAnswer::Failed(_)));
}
