//! Core client traits and error types.

use async_trait::async_trait;
use futures::Stream;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::model::{Message, Response, StreamChunk};
use crate::options::{ModelOptions, TransportOptions};

/// Errors that can occur during client operations.
///
/// Streaming failures are never retried in this layer and never revoke
/// values the consumer already received.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status; carries the raw error body text.
    #[error("transport error: {0}")]
    Transport(String),

    /// A frame or line failed JSON parsing; carries the raw offending text.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// A successfully parsed payload explicitly signalled an error.
    #[error("stream error: {0}")]
    Stream(String),

    /// Underlying socket connection failure.
    #[error("socket error: {0}")]
    Socket(String),

    /// The abort signal fired while a wait was outstanding.
    #[error("stream cancelled")]
    StreamCancelled,

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("provider error: {0}")]
    ProviderError(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        ClientError::Socket(err.to_string())
    }
}

/// Main client trait for LLM providers.
///
/// Implement this trait to add support for a new provider. Each provider
/// defines its own model and transport option types.
///
/// The static [`Client::request`] method gives full control with explicit
/// options; the instance methods are convenience wrappers over the options
/// stored in the client.
#[async_trait]
pub trait Client: Send + Sync + Sized {
    /// Provider-specific model options type.
    type ModelProvider: Send + Sync;

    /// Provider-specific transport options type.
    type TransportProvider: Send + Sync;

    /// Send a request with explicit options and wait for the full response.
    async fn request(
        messages: Vec<Message>,
        model_options: &ModelOptions<Self::ModelProvider>,
        transport_options: &TransportOptions<Self::TransportProvider>,
    ) -> Result<Response, ClientError>;

    /// Create a new client instance with the given default options.
    fn new(
        model_options: ModelOptions<Self::ModelProvider>,
        transport_options: TransportOptions<Self::TransportProvider>,
    ) -> Self;

    /// Get a reference to the stored model options.
    fn model_options(&self) -> &ModelOptions<Self::ModelProvider>;

    /// Get a reference to the stored transport options.
    fn transport_options(&self) -> &TransportOptions<Self::TransportProvider>;

    /// Send a request using the options stored in the client.
    async fn chat(&self, messages: Vec<Message>) -> Result<Response, ClientError> {
        Self::request(messages, self.model_options(), self.transport_options()).await
    }

    /// Send a request overriding the stored model options.
    async fn chat_with_options(
        &self,
        messages: Vec<Message>,
        model_options: &ModelOptions<Self::ModelProvider>,
    ) -> Result<Response, ClientError> {
        Self::request(messages, model_options, self.transport_options()).await
    }
}

/// Extension trait for streaming support.
///
/// Providers that support streaming implement this in addition to [`Client`].
/// The caller owns the [`CancellationToken`]; cancelling it closes the
/// underlying connection and fails the pending wait with
/// [`ClientError::StreamCancelled`] instead of hanging. A finished or failed
/// stream cannot be replayed; create a new session instead.
#[allow(async_fn_in_trait)]
pub trait StreamingClient: Client {
    /// Start a streaming request with explicit options.
    ///
    /// Returns a lazy, finite, forward-only sequence of chunks in wire
    /// arrival order.
    async fn request_stream(
        messages: Vec<Message>,
        model_options: &ModelOptions<Self::ModelProvider>,
        transport_options: &TransportOptions<Self::TransportProvider>,
        cancel: CancellationToken,
    ) -> Result<impl Stream<Item = Result<StreamChunk, ClientError>> + Send, ClientError>;

    /// Stream a response using the options stored in the client.
    async fn chat_stream(
        &self,
        messages: Vec<Message>,
    ) -> Result<impl Stream<Item = Result<StreamChunk, ClientError>> + Send, ClientError> {
        Self::request_stream(
            messages,
            <Self as Client>::model_options(self),
            <Self as Client>::transport_options(self),
            CancellationToken::new(),
        )
        .await
    }

    /// Stream a response with an external abort signal.
    async fn chat_stream_cancellable(
        &self,
        messages: Vec<Message>,
        cancel: CancellationToken,
    ) -> Result<impl Stream<Item = Result<StreamChunk, ClientError>> + Send, ClientError> {
        Self::request_stream(
            messages,
            <Self as Client>::model_options(self),
            <Self as Client>::transport_options(self),
            cancel,
        )
        .await
    }
}
