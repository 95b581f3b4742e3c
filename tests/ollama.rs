//! Integration tests for the Ollama client using wiremock.

use std::time::Duration;

use futures::StreamExt;
use nonempty::nonempty;
use ollama_stream::client::{Client, StreamingClient};
use ollama_stream::model::Message;
use ollama_stream::options::{HttpTransport, ModelOptions, OllamaModel, TransportOptions};
use ollama_stream::providers::OllamaClient;
use ollama_stream::ClientError;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> OllamaClient {
    OllamaClient::new(
        ModelOptions::new(OllamaModel::default()).with_model("llama2".to_string()),
        TransportOptions::new(HttpTransport::new(server.uri())).with_timeout(Duration::from_secs(5)),
    )
}

fn ndjson(lines: &[serde_json::Value]) -> String {
    lines
        .iter()
        .map(|line| format!("{line}\n"))
        .collect()
}

fn streaming_body(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "application/x-ndjson")
}

#[tokio::test]
async fn generate_sends_non_streaming_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(serde_json::json!({
            "model": "llama2",
            "prompt": "What is the capital of France?",
            "stream": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "model": "llama2",
            "created_at": "2024-01-01T00:00:00Z",
            "response": "Paris.",
            "done": true,
            "done_reason": "stop",
            "eval_count": 3,
            "prompt_eval_count": 9
        })))
        .expect(1)
        .mount(&server)
        .await;

    let reply = client_for(&server)
        .generate("What is the capital of France?".to_string())
        .await
        .expect("generate should succeed");

    assert_eq!(reply.response, "Paris.");
    assert!(reply.done);
    assert_eq!(reply.usage.eval_count, Some(3));
    assert_eq!(reply.usage.prompt_eval_count, Some(9));
}

#[tokio::test]
async fn chat_returns_message_content() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(serde_json::json!({
            "model": "llama2",
            "stream": false,
            "messages": [
                {"role": "system", "content": "You are a helpful AI assistant."},
                {"role": "user", "content": "What is machine learning?"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "model": "llama2",
            "message": {"role": "assistant", "content": "Machine learning is..."},
            "done": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let messages = nonempty![
        Message::system("You are a helpful AI assistant."),
        Message::user("What is machine learning?")
    ];

    let reply = client_for(&server)
        .chat(messages)
        .await
        .expect("chat should succeed");

    assert_eq!(reply.message, Message::assistant("Machine learning is..."));
}

#[tokio::test]
async fn chat_with_options_overrides_model() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(serde_json::json!({
            "model": "mistral",
            "options": {"temperature": 0.5}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "model": "mistral",
            "message": {"role": "assistant", "content": "ok"},
            "done": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let options = ModelOptions::new(OllamaModel::default())
        .with_model("mistral".to_string())
        .with_temperature(0.5);

    let reply = client_for(&server)
        .chat_with_options(nonempty![Message::user("hi")], &options)
        .await
        .expect("chat should succeed");

    assert_eq!(reply.model, "mistral");
}

#[tokio::test]
async fn generate_stream_yields_fragments_in_order() {
    let server = MockServer::start().await;

    let body = ndjson(&[
        serde_json::json!({"model": "llama2", "response": "Hel", "done": false}),
        serde_json::json!({"model": "llama2", "response": "lo", "done": false}),
        serde_json::json!({"model": "llama2", "response": "", "done": true, "done_reason": "stop", "eval_count": 2}),
    ]);

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(serde_json::json!({"stream": true})))
        .respond_with(streaming_body(body))
        .expect(1)
        .mount(&server)
        .await;

    let mut reader = client_for(&server)
        .generate_stream("Say hello".to_string())
        .await
        .expect("stream should start");

    let mut fragments = Vec::new();
    while let Some(fragment) = reader.next().await {
        fragments.push(fragment.expect("fragment"));
    }

    assert_eq!(fragments, vec!["Hel", "lo"]);
    assert!(reader.is_closed());

    let completion = reader.completion().expect("completion record");
    assert_eq!(completion.done_reason.as_deref(), Some("stop"));
    assert_eq!(completion.usage().eval_count, Some(2));
}

#[tokio::test]
async fn chat_stream_reads_message_deltas() {
    let server = MockServer::start().await;

    let body = ndjson(&[
        serde_json::json!({"message": {"role": "assistant", "content": "A "}, "done": false}),
        serde_json::json!({"message": {"role": "assistant", "content": "spam filter."}, "done": false}),
        serde_json::json!({"message": {"role": "assistant", "content": ""}, "done": true}),
    ]);

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(serde_json::json!({"stream": true})))
        .respond_with(streaming_body(body))
        .mount(&server)
        .await;

    let mut reader = client_for(&server)
        .chat_stream(nonempty![Message::user("Can you give me an example?")])
        .await
        .expect("stream should start");

    assert_eq!(reader.collect_text().await.unwrap(), "A spam filter.");
}

#[tokio::test]
async fn generate_stream_reports_truncation() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(streaming_body(
            ndjson(&[serde_json::json!({"response": "Hi"})]),
        ))
        .mount(&server)
        .await;

    let mut reader = client_for(&server)
        .generate_stream("Hello".to_string())
        .await
        .expect("stream should start");

    assert_eq!(reader.next().await.unwrap().unwrap(), "Hi");
    assert!(matches!(
        reader.next().await,
        Some(Err(ClientError::TruncatedStream { records: 1 }))
    ));
    assert!(reader.next().await.is_none());
}

#[tokio::test]
async fn generate_stream_reports_malformed_record() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(streaming_body("not-json\n{\"response\":\"x\",\"done\":true}\n".to_string()))
        .mount(&server)
        .await;

    let mut reader = client_for(&server)
        .generate_stream("Hello".to_string())
        .await
        .expect("stream should start");

    let first = reader.next().await.expect("an item");
    assert!(matches!(first, Err(ClientError::MalformedRecord { ref line, .. }) if line == "not-json"));
    assert!(reader.next().await.is_none());
}

#[tokio::test]
async fn error_status_maps_to_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(serde_json::json!({"error": "model 'mistral' not found"})),
        )
        .mount(&server)
        .await;

    let result = client_for(&server).generate("Hi".to_string()).await;

    match result {
        Err(ClientError::Api { status, message }) => {
            assert_eq!(status.as_u16(), 404);
            assert_eq!(message, "model 'mistral' not found");
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}

#[tokio::test]
async fn error_status_on_stream_fails_before_reading() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let result = client_for(&server)
        .chat_stream(nonempty![Message::user("hi")])
        .await;

    assert!(matches!(result, Err(ClientError::Api { ref message, .. }) if message == "boom"));
}

#[tokio::test]
async fn extra_headers_are_sent() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(wiremock::matchers::header("x-request-source", "tests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "model": "llama2",
            "response": "ok",
            "done": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let transport = TransportOptions::new(
        HttpTransport::new(format!("{}/", server.uri()))
            .with_header("X-Request-Source".to_string(), "tests".to_string()),
    );
    let client = OllamaClient::new(ModelOptions::new(OllamaModel::default()), transport);

    let reply = client.generate("ping".to_string()).await.expect("generate");
    assert_eq!(reply.response, "ok");
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    let client = OllamaClient::new(
        ModelOptions::new(OllamaModel::default()),
        TransportOptions::new(HttpTransport::new("http://127.0.0.1:9")),
    );

    let result = client.generate_stream("Hi".to_string()).await;
    assert!(matches!(result, Err(ClientError::Transport(_))));
}

#[tokio::test]
async fn invalid_proxy_is_a_config_error() {
    let server = MockServer::start().await;
    let transport = HttpTransport::new(server.uri()).with_proxy("::not a url::".to_string());
    let client = OllamaClient::new(
        ModelOptions::new(OllamaModel::default()).with_model("llama2".to_string()),
        TransportOptions::new(transport),
    );

    let result = client.generate("Hi".to_string()).await;
    assert!(matches!(result, Err(ClientError::Config(_))));
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn error_status_with_empty_body_uses_reason() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = client_for(&server)
        .chat(nonempty![Message::user("Hi")])
        .await;
    assert!(matches!(
        result,
        Err(ClientError::Api { ref message, .. }) if message == "Service Unavailable"
    ));
}
