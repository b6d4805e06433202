//! HTTP-level tests for the OpenAI-compatible gateway provider.

use deepresearch_core::brain::{LlmProvider, is_error_marker};
use deepresearch_core::config::LlmConfig;
use deepresearch_core::error::LlmError;
use deepresearch_core::providers::OpenAiCompatibleProvider;
use deepresearch_core::providers::openai_compat::TRUNCATION_MARKER;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn completion(content: &str) -> serde_json::Value {
    json!({ "choices": [ { "message": { "role": "assistant", "content": content } } ] })
}

fn provider(server: &MockServer, config: LlmConfig) -> OpenAiCompatibleProvider {
    OpenAiCompatibleProvider::new(&config, server.uri(), "sk-test").unwrap()
}

#[tokio::test]
async fn test_first_path_success_sends_expected_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "message": "hello",
            "model": "deepseek-v3",
            "max_tokens": 128000,
            "stream": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("hi there")))
        .expect(1)
        .mount(&server)
        .await;

    let llm = provider(&server, LlmConfig::default());
    assert_eq!(llm.try_complete("hello").await.unwrap(), "hi there");
    assert_eq!(llm.cached_path().as_deref(), Some("v1/chat/completions"));
}

#[tokio::test]
async fn test_falls_through_to_working_path_and_caches_it() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("found it")))
        .expect(2)
        .mount(&server)
        .await;

    let llm = provider(&server, LlmConfig::default());
    assert_eq!(llm.try_complete("one").await.unwrap(), "found it");
    assert_eq!(llm.cached_path().as_deref(), Some("v1/completions"));

    // The second call goes straight to the cached path.
    assert_eq!(llm.try_complete("two").await.unwrap(), "found it");
}

#[tokio::test]
async fn test_malformed_body_moves_to_next_path() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("ok")))
        .mount(&server)
        .await;

    let llm = provider(&server, LlmConfig::default());
    assert_eq!(llm.try_complete("p").await.unwrap(), "ok");
}

#[tokio::test]
async fn test_all_paths_fail_is_model_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .expect(10)
        .mount(&server)
        .await;

    let llm = provider(&server, LlmConfig::default());
    match llm.try_complete("p").await {
        Err(LlmError::ModelUnavailable { attempts }) => {
            assert_eq!(attempts.len(), 5);
            assert!(attempts[0].starts_with("v1/chat/completions: HTTP 503"));
        }
        other => panic!("expected ModelUnavailable, got {other:?}"),
    }
    assert!(llm.cached_path().is_none());

    let text = llm.complete("p2").await;
    assert!(is_error_marker(&text));
}

#[tokio::test]
async fn test_connection_refused_returns_error_marker() {
    let config = LlmConfig {
        timeout_secs: 5,
        ..Default::default()
    };
    let llm = OpenAiCompatibleProvider::new(&config, "http://127.0.0.1:1", "sk-test").unwrap();
    let text = llm.complete("hello").await;
    assert!(is_error_marker(&text), "got: {text}");
}

#[tokio::test]
async fn test_long_response_truncated() {
    let server = MockServer::start().await;
    let long = "a".repeat(50);
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(&long)))
        .mount(&server)
        .await;

    let config = LlmConfig {
        max_response_chars: 20,
        ..Default::default()
    };
    let llm = provider(&server, config);
    let text = llm.try_complete("p").await.unwrap();
    assert_eq!(text, format!("{}{TRUNCATION_MARKER}", "a".repeat(20)));
}

#[tokio::test]
async fn test_custom_endpoint_paths() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/gateway/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("custom")))
        .expect(1)
        .mount(&server)
        .await;

    let config = LlmConfig {
        endpoint_paths: vec!["gateway/generate".to_string()],
        ..Default::default()
    };
    let llm = provider(&server, config);
    assert_eq!(llm.try_complete("p").await.unwrap(), "custom");
}
