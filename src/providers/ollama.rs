//! Ollama HTTP API client implementation.
//!
//! This module implements [`Client`] and [`StreamingClient`] against the
//! `/api/generate` and `/api/chat` endpoints of a local inference server.
//! See: <https://github.com/ollama/ollama/blob/main/docs/api.md>

use async_trait::async_trait;
use nonempty::NonEmpty;
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::client::{Client, ClientError, StreamingClient};
use crate::http::{add_extra_headers, build_http_client};
use crate::model::{ChatResponse, GenerateResponse, Message};
use crate::options::{HttpTransport, ModelOptions, OllamaModel, TransportOptions};
use crate::stream::FragmentReader;

const GENERATE_PATH: &str = "/api/generate";
const CHAT_PATH: &str = "/api/chat";
const DEFAULT_MODEL: &str = "llama2";

/// Ollama client using HTTP transport.
///
/// # Example
/// ```no_run
/// use ollama_stream::client::Client;
/// use ollama_stream::providers::OllamaClient;
///
/// # async fn run() -> Result<(), ollama_stream::ClientError> {
/// let client = OllamaClient::default();
/// let reply = client
///     .generate("What is the capital of France?".to_string())
///     .await?;
/// println!("{}", reply.response);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct OllamaClient {
    model_options: ModelOptions<OllamaModel>,
    transport_options: TransportOptions<HttpTransport>,
}

impl OllamaClient {
    /// Create a new Ollama client with default options.
    pub fn new(
        model_options: ModelOptions<OllamaModel>,
        transport_options: TransportOptions<HttpTransport>,
    ) -> Self {
        Self {
            model_options,
            transport_options,
        }
    }

    /// POST a JSON body and return the response once its status is known good.
    async fn post<B: Serialize>(
        path: &str,
        body: &B,
        model: &str,
        stream: bool,
        transport_options: &TransportOptions<HttpTransport>,
    ) -> Result<reqwest::Response, ClientError> {
        let url = transport_options.provider.endpoint(path);
        let http_client = build_http_client(transport_options)?;

        let mut req = http_client
            .post(&url)
            .header(CONTENT_TYPE, "application/json");
        req = add_extra_headers(req, &transport_options.provider.extra_headers)?;

        debug!(%url, model, stream, "sending request");
        let response = req.json(body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    warn!(%url, %status, error = %e, "failed to read error response body");
                    String::new()
                }
            };
            return Err(Self::handle_error_response(status, &body));
        }

        Ok(response)
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Handle Ollama error responses.
    ///
    /// An empty or unreadable body falls back to the status reason phrase.
    fn handle_error_response(status: reqwest::StatusCode, body: &str) -> ClientError {
        let message = match serde_json::from_str::<OllamaErrorResponse>(body) {
            Ok(error_resp) => error_resp.error,
            Err(_) if body.trim().is_empty() => status
                .canonical_reason()
                .unwrap_or("no error body")
                .to_string(),
            Err(_) => body.trim().to_string(),
        };
        ClientError::Api { status, message }
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new(
            ModelOptions::new(OllamaModel::default()).with_model(DEFAULT_MODEL.to_string()),
            TransportOptions::new(HttpTransport::from_env()),
        )
    }
}

#[async_trait]
impl Client for OllamaClient {
    type ModelProvider = OllamaModel;
    type TransportProvider = HttpTransport;

    async fn generate_request(
        prompt: String,
        model_options: &ModelOptions<Self::ModelProvider>,
        transport_options: &TransportOptions<Self::TransportProvider>,
    ) -> Result<GenerateResponse, ClientError> {
        let request_body = OllamaGenerateRequest::from((prompt, model_options));
        let response = Self::post(
            GENERATE_PATH,
            &request_body,
            &request_body.model,
            false,
            transport_options,
        )
        .await?;
        Self::read_json(response).await
    }

    async fn chat_request(
        messages: NonEmpty<Message>,
        model_options: &ModelOptions<Self::ModelProvider>,
        transport_options: &TransportOptions<Self::TransportProvider>,
    ) -> Result<ChatResponse, ClientError> {
        let request_body = OllamaChatRequest::from((messages, model_options));
        let response = Self::post(
            CHAT_PATH,
            &request_body,
            &request_body.model,
            false,
            transport_options,
        )
        .await?;
        Self::read_json(response).await
    }

    fn new(
        model_options: ModelOptions<Self::ModelProvider>,
        transport_options: TransportOptions<Self::TransportProvider>,
    ) -> Self {
        Self {
            model_options,
            transport_options,
        }
    }

    fn model_options(&self) -> &ModelOptions<Self::ModelProvider> {
        &self.model_options
    }

    fn transport_options(&self) -> &TransportOptions<Self::TransportProvider> {
        &self.transport_options
    }
}

#[async_trait]
impl StreamingClient for OllamaClient {
    async fn generate_stream_request(
        prompt: String,
        model_options: &ModelOptions<Self::ModelProvider>,
        transport_options: &TransportOptions<Self::TransportProvider>,
    ) -> Result<FragmentReader, ClientError> {
        let mut request_body = OllamaGenerateRequest::from((prompt, model_options));
        request_body.stream = true;

        let response = Self::post(
            GENERATE_PATH,
            &request_body,
            &request_body.model,
            true,
            transport_options,
        )
        .await?;
        Ok(FragmentReader::from_response(response))
    }

    async fn chat_stream_request(
        messages: NonEmpty<Message>,
        model_options: &ModelOptions<Self::ModelProvider>,
        transport_options: &TransportOptions<Self::TransportProvider>,
    ) -> Result<FragmentReader, ClientError> {
        let mut request_body = OllamaChatRequest::from((messages, model_options));
        request_body.stream = true;

        let response = Self::post(
            CHAT_PATH,
            &request_body,
            &request_body.model,
            true,
            transport_options,
        )
        .await?;
        Ok(FragmentReader::from_response(response))
    }
}

impl From<(String, &ModelOptions<OllamaModel>)> for OllamaGenerateRequest {
    fn from((prompt, model_options): (String, &ModelOptions<OllamaModel>)) -> Self {
        OllamaGenerateRequest {
            model: resolve_model(model_options),
            prompt,
            system: model_options.instructions.clone(),
            stream: false,
            options: OllamaRuntimeOptions::from_model_options(model_options),
            keep_alive: model_options.provider.keep_alive.clone(),
        }
    }
}

impl From<(NonEmpty<Message>, &ModelOptions<OllamaModel>)> for OllamaChatRequest {
    fn from((messages, model_options): (NonEmpty<Message>, &ModelOptions<OllamaModel>)) -> Self {
        let system = model_options.instructions.clone().map(Message::system);

        OllamaChatRequest {
            model: resolve_model(model_options),
            messages: system.into_iter().chain(messages).collect(),
            stream: false,
            options: OllamaRuntimeOptions::from_model_options(model_options),
            keep_alive: model_options.provider.keep_alive.clone(),
        }
    }
}

fn resolve_model(model_options: &ModelOptions<OllamaModel>) -> String {
    model_options
        .model
        .clone()
        .unwrap_or_else(|| DEFAULT_MODEL.to_string())
}

impl OllamaRuntimeOptions {
    /// `None` when no sampling parameter is set, so the server keeps its defaults.
    fn from_model_options(model_options: &ModelOptions<OllamaModel>) -> Option<Self> {
        let options = OllamaRuntimeOptions {
            temperature: model_options.temperature,
            top_p: model_options.top_p,
            top_k: model_options.provider.top_k,
            num_predict: model_options.max_tokens,
            seed: model_options.provider.seed,
        };
        (options != OllamaRuntimeOptions::default()).then_some(options)
    }
}

// --- Ollama API Request/Response Types ---

#[derive(Debug, Clone, Serialize)]
struct OllamaGenerateRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaRuntimeOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    keep_alive: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<Message>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaRuntimeOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    keep_alive: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
struct OllamaRuntimeOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
struct OllamaErrorResponse {
    error: String,
}
