// Chat backend tests: the Dify path against an in-process stub, and the
// canned-fallback behavior when a backend is unavailable.

use axum::{http::StatusCode, routing::post, Json, Router};
use speakroom::config::{ChatConfig, DifyConfig, GeminiConfig};
use speakroom::{ChatClient, ChatError, ChatMode};

async fn spawn_dify(status: StatusCode, body: serde_json::Value) -> String {
    let app = Router::new().route(
        "/chat-messages",
        post(move || {
            let body = body.clone();
            async move { (status, Json(body)) }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}

fn client_for(api_base: String) -> ChatClient {
    ChatClient::new(ChatConfig {
        dify: DifyConfig {
            api_base,
            api_token: "test-token".to_string(),
        },
        gemini: GeminiConfig::default(),
    })
}

#[tokio::test]
async fn dify_answer_comes_back_verbatim() {
    let base = spawn_dify(
        StatusCode::OK,
        serde_json::json!({"answer": "Use the present perfect here."}),
    )
    .await;

    let client = client_for(base);
    let answer = client
        .ask(ChatMode::Dify, "Which tense fits?", None)
        .await
        .unwrap();
    assert_eq!(answer, "Use the present perfect here.");
}

#[tokio::test]
async fn dify_nested_answer_shape_is_accepted() {
    let base = spawn_dify(
        StatusCode::OK,
        serde_json::json!({"data": {"answer": "nested"}}),
    )
    .await;

    let client = client_for(base);
    let answer = client.ask(ChatMode::Dify, "hello", None).await.unwrap();
    assert_eq!(answer, "nested");
}

#[tokio::test]
async fn backend_error_degrades_to_canned_answer() {
    let base = spawn_dify(
        StatusCode::INTERNAL_SERVER_ERROR,
        serde_json::json!({"message": "boom"}),
    )
    .await;

    let client = client_for(base);

    let err = client
        .ask(ChatMode::Dify, "hello", None)
        .await
        .expect_err("5xx surfaces as error");
    assert!(matches!(err, ChatError::Api { .. }));

    // The fallback path swallows the failure and answers locally.
    let answer = client.ask_or_fallback(ChatMode::Dify, "hello", None).await;
    assert!(!answer.is_empty());
}

#[tokio::test]
async fn unconfigured_backends_fail_fast() {
    let client = ChatClient::new(ChatConfig::default());

    assert!(matches!(
        client.ask(ChatMode::Dify, "hello", None).await,
        Err(ChatError::NotConfigured)
    ));
    assert!(matches!(
        client.ask(ChatMode::Gemini, "hello", None).await,
        Err(ChatError::NotConfigured)
    ));

    // Both still produce a canned answer through the fallback path.
    let answer = client.ask_or_fallback(ChatMode::Gemini, "hello", None).await;
    assert!(!answer.is_empty());
}
