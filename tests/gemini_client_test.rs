//! Integration tests for the Gemini client against a mocked HTTP server.

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use worklog::config::GeneratorConfig;
use worklog::error::GenerationError;
use worklog::message::{GeminiClient, MessageGenerator, MessageSource, PromptInput, TextGenerator};

const GENERATE_PATH: &str = "/v1beta/models/gemini-1.5-flash:generateContent";

fn client_for(server: &MockServer) -> GeminiClient {
    let config = GeneratorConfig {
        api_base: server.uri(),
        api_key: Some("test-key".to_string()),
        timeout_secs: 5,
        ..Default::default()
    };
    GeminiClient::new(&config).expect("Failed to build client")
}

fn text_response(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": {
                "role": "model",
                "parts": [{ "text": text }]
            },
            "finishReason": "STOP"
        }]
    })
}

fn error_response(code: u16, message: &str, status: &str) -> serde_json::Value {
    json!({ "error": { "code": code, "message": message, "status": status } })
}

#[tokio::test]
async fn test_generate_sends_prompt_and_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_partial_json(json!({
            "contents": [{ "parts": [{ "text": "summarize this" }] }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_response("Add parser")))
        .expect(1)
        .mount(&server)
        .await;

    let text = client_for(&server).generate("summarize this").await.unwrap();
    assert_eq!(text, "Add parser");
}

#[tokio::test]
async fn test_generate_joins_multiple_parts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Fix " }, { "text": "tests" }] }
            }]
        })))
        .mount(&server)
        .await;

    let text = client_for(&server).generate("p").await.unwrap();
    assert_eq!(text, "Fix tests");
}

#[tokio::test]
async fn test_unauthorized_is_classified() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(error_response(403, "Permission denied", "PERMISSION_DENIED")),
        )
        .mount(&server)
        .await;

    let result = client_for(&server).generate("p").await;
    assert!(matches!(result, Err(GenerationError::Unauthorized { status: 403 })));
}

#[tokio::test]
async fn test_quota_is_classified() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(error_response(
            429,
            "Resource has been exhausted",
            "RESOURCE_EXHAUSTED",
        )))
        .mount(&server)
        .await;

    match client_for(&server).generate("p").await {
        Err(GenerationError::QuotaExceeded { message }) => {
            assert_eq!(message, "Resource has been exhausted");
        }
        other => panic!("expected quota error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_is_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    match client_for(&server).generate("p").await {
        Err(GenerationError::Api { status, message }) => {
            assert_eq!(status, 503);
            assert_eq!(message, "upstream unavailable");
        }
        other => panic!("expected API error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_body_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let result = client_for(&server).generate("p").await;
    assert!(matches!(result, Err(GenerationError::InvalidResponse(_))));
}

#[tokio::test]
async fn test_no_candidates_is_empty_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
        .mount(&server)
        .await;

    let result = client_for(&server).generate("p").await;
    assert!(matches!(result, Err(GenerationError::EmptyResponse)));
}

#[tokio::test]
async fn test_unreachable_server_is_network_error() {
    // Nothing listens on port 1
    let config = GeneratorConfig {
        api_base: "http://127.0.0.1:1".to_string(),
        api_key: Some("test-key".to_string()),
        timeout_secs: 5,
        ..Default::default()
    };
    let client = GeminiClient::new(&config).unwrap();

    let result = client.generate("p").await;
    assert!(matches!(result, Err(GenerationError::Network(_))));
}

#[tokio::test]
async fn test_message_generator_falls_back_on_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let generator = MessageGenerator::new(client_for(&server));
    let files = vec!["a.rs".to_string(), "b.rs".to_string()];
    let message = generator
        .generate(
            &PromptInput {
                files: &files,
                interval_minutes: 1,
                ..Default::default()
            },
            files.len(),
        )
        .await;

    assert_eq!(message.text, "Changes in 2 files");
    assert_eq!(message.source, MessageSource::Fallback);
}

#[tokio::test]
async fn test_message_generator_cleans_fenced_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(text_response("```\n\"Refactor watcher setup\"\n```\n")),
        )
        .mount(&server)
        .await;

    let generator = MessageGenerator::new(client_for(&server));
    let files = vec!["watch.rs".to_string()];
    let message = generator
        .generate(
            &PromptInput {
                files: &files,
                interval_minutes: 1,
                ..Default::default()
            },
            files.len(),
        )
        .await;

    assert_eq!(message.text, "Refactor watcher setup");
    assert_eq!(message.source, MessageSource::Generated);
}
