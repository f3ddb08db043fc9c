//! Local agent client speaking the WebSocket delta protocol.
//!
//! The agent daemon accepts one JSON message per connection and streams its
//! reply back as incremental `kDelta` events terminated by `kFinish`.
//! Reranking uses a single-shot socket request; embeddings go over plain
//! HTTP to the daemon's embedding endpoint.

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::client::{Client, ClientError, StreamingClient};
use crate::http::{build_http_client, error_for_status_text};
use crate::model::{flatten_messages, FinishReason, Message, Response, Role, StreamChunk};
use crate::options::{AgentModel, ModelOptions, TransportOptions, WsTransport};
use crate::ws::{request_once, stream_deltas};

const DEFAULT_SOCKET_URL: &str = "ws://localhost:8765";
const DEFAULT_EMBED_URL: &str = "http://127.0.0.1:1234";

/// Models the local agent can proxy to.
const MODELS: &[&str] = &[
    "codestral-latest",
    "claude-3-5-sonnet-latest",
    "llama3.1-405b",
    "llama3.1-70b",
    "gpt-4o",
    "gpt-3.5-turbo",
    "claude-3-5-haiku-latest",
    "gemini-1.5-pro-latest",
];

/// Client for a local agent daemon reachable over WebSocket.
pub struct AgentClient {
    model_options: ModelOptions<AgentModel>,
    transport_options: TransportOptions<WsTransport>,
}

#[derive(Debug, Deserialize)]
struct RerankReply {
    results: Vec<RerankResult>,
}

#[derive(Debug, Deserialize)]
struct RerankResult {
    relevance_score: f32,
}

#[derive(Debug, Deserialize)]
struct EmbedReply {
    embeddings: Vec<Vec<f32>>,
}

impl AgentClient {
    fn socket_url(transport_options: &TransportOptions<WsTransport>) -> String {
        transport_options
            .provider
            .url
            .clone()
            .unwrap_or_else(|| DEFAULT_SOCKET_URL.to_string())
    }

    /// Score `documents` against `query` using the agent's reranker.
    pub async fn rerank(
        &self,
        query: &str,
        documents: Vec<String>,
    ) -> Result<Vec<f32>, ClientError> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let url = Self::socket_url(&self.transport_options);
        let reply = request_once(
            &url,
            "rerank",
            json!({ "query": query, "documents": documents }),
            CancellationToken::new(),
        )
        .await?;

        let parsed: RerankReply = serde_json::from_value(reply)?;
        Ok(parsed
            .results
            .into_iter()
            .map(|result| result.relevance_score)
            .collect())
    }

    /// Embed a batch of inputs via the agent's HTTP endpoint.
    pub async fn embed(&self, inputs: Vec<String>) -> Result<Vec<Vec<f32>>, ClientError> {
        let url = self
            .transport_options
            .provider
            .http_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_EMBED_URL.to_string());

        let http_client = build_http_client(&self.transport_options)?;
        let response = http_client
            .post(&url)
            .json(&json!({ "input": inputs }))
            .send()
            .await?;
        let response = error_for_status_text(response).await?;

        let parsed: EmbedReply = response.json().await?;
        Ok(parsed.embeddings)
    }

    /// Model identifiers the agent accepts.
    pub fn list_models(&self) -> Vec<String> {
        MODELS.iter().map(|model| model.to_string()).collect()
    }
}

#[async_trait]
impl Client for AgentClient {
    type ModelProvider = AgentModel;
    type TransportProvider = WsTransport;

    /// Drains the streaming session and concatenates the deltas into one
    /// assistant message.
    async fn request(
        messages: Vec<Message>,
        model_options: &ModelOptions<Self::ModelProvider>,
        transport_options: &TransportOptions<Self::TransportProvider>,
    ) -> Result<Response, ClientError> {
        let stream = Self::request_stream(
            messages,
            model_options,
            transport_options,
            CancellationToken::new(),
        )
        .await?;
        futures::pin_mut!(stream);

        let mut content = String::new();
        while let Some(chunk) = stream.next().await {
            if let StreamChunk::Data(message) = chunk? {
                content.push_str(&message.render());
            }
        }

        Ok(Response {
            data: vec![Message::text(Role::Assistant, content)],
            finish: FinishReason::Stop,
        })
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

impl StreamingClient for AgentClient {
    async fn request_stream(
        messages: Vec<Message>,
        _model_options: &ModelOptions<Self::ModelProvider>,
        transport_options: &TransportOptions<Self::TransportProvider>,
        cancel: CancellationToken,
    ) -> Result<impl Stream<Item = Result<StreamChunk, ClientError>> + Send, ClientError> {
        let url = Self::socket_url(transport_options);
        let combined = flatten_messages(&messages);
        debug!(url = %url, chars = combined.len(), "starting agent chat stream");

        let outbound = json!({ "user": { "content": combined } });
        let deltas = stream_deltas(&url, outbound, cancel).await?;

        Ok(async_stream::stream! {
            futures::pin_mut!(deltas);
            while let Some(result) = deltas.next().await {
                match result {
                    Ok(content) => {
                        // The agent occasionally pads with whitespace-only
                        // deltas; they carry no message content.
                        if !content.trim().is_empty() {
                            yield Ok(StreamChunk::Data(Message::text(Role::Assistant, content)));
                        }
                    }
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
            yield Ok(StreamChunk::Finish(FinishReason::Stop));
        })
    }
}

impl Default for AgentClient {
    fn default() -> Self {
        <Self as Client>::new(
            ModelOptions::new(AgentModel {}),
            TransportOptions::new(WsTransport::default()),
        )
    }
}
