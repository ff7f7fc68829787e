//! Anthropic provider tests against a local mock server

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use glotsync_provider::{
    CompletionRequest, ModelOptions, ProviderCredentials, ProviderError, create_provider,
    get_all_provider_metadata,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn options(server: &MockServer) -> ModelOptions {
    ModelOptions {
        model: Some("claude-test".to_string()),
        base_url: Some(format!("{}/v1", server.uri())),
        max_retries: 0,
        timeout_secs: 5,
        ..ModelOptions::default()
    }
}

fn credentials() -> ProviderCredentials {
    ProviderCredentials::Anthropic {
        api_key: "sk-ant-test".to_string(),
    }
}

#[tokio::test]
async fn complete_sends_system_and_joins_text_blocks() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "sk-ant-test"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(json!({
            "model": "claude-test",
            "system": "Translate into German.",
            "messages": [{ "role": "user", "content": "{\"k1\":\"Save\"}" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg_1",
            "type": "message",
            "role": "assistant",
            "content": [
                { "type": "text", "text": "{\"k1\":" },
                { "type": "text", "text": "\"Speichern\"}" }
            ],
            "stop_reason": "end_turn"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let model = create_provider(credentials(), options(&server)).unwrap();
    let text = model
        .complete(&CompletionRequest::new(
            "Translate into German.",
            "{\"k1\":\"Save\"}",
        ))
        .await
        .unwrap();
    assert_eq!(text, "{\"k1\":\"Speichern\"}");
}

#[tokio::test]
async fn typed_error_body_is_mapped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "type": "error",
            "error": { "type": "not_found_error", "message": "model: claude-test" }
        })))
        .mount(&server)
        .await;

    let model = create_provider(credentials(), options(&server)).unwrap();
    let err = model.complete(&CompletionRequest::new("s", "u")).await.unwrap_err();
    match err {
        ProviderError::ModelNotFound { model, .. } => assert_eq!(model, "claude-test"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn overloaded_without_retries_is_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(529).set_body_json(json!({
            "type": "error",
            "error": { "type": "overloaded_error", "message": "Overloaded" }
        })))
        .mount(&server)
        .await;

    let model = create_provider(credentials(), options(&server)).unwrap();
    let err = model.complete(&CompletionRequest::new("s", "u")).await.unwrap_err();
    assert!(err.is_retryable());
}

#[test]
fn metadata_lists_enabled_providers() {
    let ids: Vec<String> = get_all_provider_metadata()
        .iter()
        .map(|m| m.id.to_string())
        .collect();
    assert_eq!(ids, vec!["openai".to_string(), "anthropic".to_string()]);
}
