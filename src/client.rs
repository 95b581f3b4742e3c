//! Core client traits and error types.

use async_trait::async_trait;
use nonempty::NonEmpty;
use thiserror::Error;

use crate::model::{ChatResponse, GenerateResponse, Message};
use crate::options::{ModelOptions, TransportOptions};
use crate::stream::FragmentReader;

/// Errors that can occur during client operations.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Connection or IO failure on the underlying transport.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A stream line could not be decoded as one JSON record.
    #[error("malformed record {line:?}: {source}")]
    MalformedRecord {
        line: String,
        #[source]
        source: serde_json::Error,
    },

    /// A stream line grew past the accepted length.
    #[error("stream line exceeds {limit} bytes")]
    LineTooLong { limit: usize },

    /// The transport closed before a record with `done = true` arrived.
    #[error("stream ended after {records} records without a completion record")]
    TruncatedStream { records: usize },

    /// The server reported an error inside the stream.
    #[error("server error: {0}")]
    Server(String),

    /// The server answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api {
        status: reqwest::StatusCode,
        message: String,
    },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Main client trait for the inference server.
///
/// Each implementation defines its own model and transport option types.
///
/// # Required Methods
/// - `generate_request`: Static single-prompt completion with explicit options
/// - `chat_request`: Static chat completion with explicit options
/// - `new`: Constructor to create a client instance
/// - `model_options` / `transport_options`: Accessors for the stored options
///
/// # Provided Methods (with default implementations)
/// - `generate`, `chat`: Use the stored options
/// - `generate_with_options`, `chat_with_options`: Override model options
#[async_trait]
pub trait Client: Send + Sync + Sized {
    /// Provider-specific model options type.
    type ModelProvider: Send + Sync;

    /// Provider-specific transport options type.
    type TransportProvider: Send + Sync;

    /// Send a prompt and wait for the complete, non-streamed reply.
    async fn generate_request(
        prompt: String,
        model_options: &ModelOptions<Self::ModelProvider>,
        transport_options: &TransportOptions<Self::TransportProvider>,
    ) -> Result<GenerateResponse, ClientError>;

    /// Send a conversation and wait for the complete, non-streamed reply.
    ///
    /// The caller owns the history: append `ChatResponse::message` and the
    /// next user turn before calling again.
    async fn chat_request(
        messages: NonEmpty<Message>,
        model_options: &ModelOptions<Self::ModelProvider>,
        transport_options: &TransportOptions<Self::TransportProvider>,
    ) -> Result<ChatResponse, ClientError>;

    /// Create a new client instance with the given default options.
    fn new(
        model_options: ModelOptions<Self::ModelProvider>,
        transport_options: TransportOptions<Self::TransportProvider>,
    ) -> Self;

    /// Get reference to the model options field.
    fn model_options(&self) -> &ModelOptions<Self::ModelProvider>;

    /// Get reference to the transport options field.
    fn transport_options(&self) -> &TransportOptions<Self::TransportProvider>;

    async fn generate(&self, prompt: String) -> Result<GenerateResponse, ClientError> {
        Self::generate_request(prompt, self.model_options(), self.transport_options()).await
    }

    async fn generate_with_options(
        &self,
        prompt: String,
        model_options: &ModelOptions<Self::ModelProvider>,
    ) -> Result<GenerateResponse, ClientError> {
        Self::generate_request(prompt, model_options, self.transport_options()).await
    }

    async fn chat(&self, messages: NonEmpty<Message>) -> Result<ChatResponse, ClientError> {
        Self::chat_request(messages, self.model_options(), self.transport_options()).await
    }

    async fn chat_with_options(
        &self,
        messages: NonEmpty<Message>,
        model_options: &ModelOptions<Self::ModelProvider>,
    ) -> Result<ChatResponse, ClientError> {
        Self::chat_request(messages, model_options, self.transport_options()).await
    }
}

/// Extension trait for streaming support.
///
/// The returned [`FragmentReader`] owns the response body. It yields text
/// fragments in arrival order and releases the connection once the
/// completion record arrives, on error, or when it is dropped.
#[async_trait]
pub trait StreamingClient: Client {
    /// Static streaming completion for a single prompt.
    async fn generate_stream_request(
        prompt: String,
        model_options: &ModelOptions<Self::ModelProvider>,
        transport_options: &TransportOptions<Self::TransportProvider>,
    ) -> Result<FragmentReader, ClientError>;

    /// Static streaming chat completion.
    async fn chat_stream_request(
        messages: NonEmpty<Message>,
        model_options: &ModelOptions<Self::ModelProvider>,
        transport_options: &TransportOptions<Self::TransportProvider>,
    ) -> Result<FragmentReader, ClientError>;

    async fn generate_stream(&self, prompt: String) -> Result<FragmentReader, ClientError> {
        Self::generate_stream_request(
            prompt,
            <Self as Client>::model_options(self),
            <Self as Client>::transport_options(self),
        )
        .await
    }

    async fn generate_stream_with_options(
        &self,
        prompt: String,
        model_options: &ModelOptions<Self::ModelProvider>,
    ) -> Result<FragmentReader, ClientError> {
        Self::generate_stream_request(
            prompt,
            model_options,
            <Self as Client>::transport_options(self),
        )
        .await
    }

    async fn chat_stream(
        &self,
        messages: NonEmpty<Message>,
    ) -> Result<FragmentReader, ClientError> {
        Self::chat_stream_request(
            messages,
            <Self as Client>::model_options(self),
            <Self as Client>::transport_options(self),
        )
        .await
    }

    async fn chat_stream_with_options(
        &self,
        messages: NonEmpty<Message>,
        model_options: &ModelOptions<Self::ModelProvider>,
    ) -> Result<FragmentReader, ClientError> {
        Self::chat_stream_request(
            messages,
            model_options,
            <Self as Client>::transport_options(self),
        )
        .await
    }
}
