//! Wire-format tests for the inference providers using wiremock.

use comet_classifier::{
    AnthropicProvider, Classifier, ClassifierError, CompletionRequest, InferenceProvider,
    OpenAiProvider,
};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn anthropic(server: &MockServer) -> AnthropicProvider {
    AnthropicProvider::new("ak-test", "claude-3-haiku-20240307", 5)
        .expect("client should build")
        .with_base_url(&server.uri())
}

fn openai(server: &MockServer) -> OpenAiProvider {
    OpenAiProvider::new("sk-test", "gpt-4o-mini", 5)
        .expect("client should build")
        .with_base_url(&server.uri())
}

#[tokio::test]
async fn anthropic_sends_headers_and_reads_text_blocks() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .and(header("x-api-key", "ak-test"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(serde_json::json!({
            "model": "claude-3-haiku-20240307",
            "max_tokens": 20,
            "system": "be brief"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "content": [{ "type": "text", "text": "ACCEPT" }],
            "stop_reason": "end_turn"
        })))
        .mount(&server)
        .await;

    let request = CompletionRequest::new("hi", 20).system("be brief");
    let text = anthropic(&server).complete(&request).await.unwrap();
    assert_eq!(text, "ACCEPT");
}

#[tokio::test]
async fn anthropic_error_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(529).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let result = anthropic(&server)
        .complete(&CompletionRequest::new("hi", 20))
        .await;
    assert!(
        matches!(result, Err(ClassifierError::Status { status: 529, ref body, .. }) if body == "overloaded")
    );
}

#[tokio::test]
async fn openai_sends_bearer_auth_and_system_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(serde_json::json!({
            "model": "gpt-4o-mini",
            "messages": [
                { "role": "system", "content": "json only" },
                { "role": "user", "content": "classify" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "[\"Girl Math\"]" } }]
        })))
        .mount(&server)
        .await;

    let request = CompletionRequest::new("classify", 500).system("json only");
    let text = openai(&server).complete(&request).await.unwrap();
    assert_eq!(text, "[\"Girl Math\"]");
}

#[tokio::test]
async fn openai_empty_choices_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })))
        .mount(&server)
        .await;

    let result = openai(&server)
        .complete(&CompletionRequest::new("x", 10))
        .await;
    assert!(matches!(result, Err(ClassifierError::EmptyResponse { .. })));
}

#[tokio::test]
async fn classifier_falls_back_from_anthropic_to_openai() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{ "message": { "content": "REJECT" } }]
        })))
        .mount(&server)
        .await;

    let providers: Vec<Box<dyn InferenceProvider>> =
        vec![Box::new(anthropic(&server)), Box::new(openai(&server))];
    let classifier = Classifier::new(providers);
    assert_eq!(classifier.provider_names(), vec!["anthropic", "openai"]);

    let verdict = classifier
        .classify_personality("kpop_updates", "KPOP Updates", "fan account")
        .await;
    assert!(!verdict.accepted);
    assert_eq!(verdict.reason, "openai: rejected (@kpop_updates)");
}
