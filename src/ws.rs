//! WebSocket sessions for the agent delta protocol.
//!
//! Two session kinds share one socket lifecycle: a streaming session that
//! sends one outbound message and consumes incremental `kDelta` events until
//! a terminal `kFinish`, and a single-shot session that resolves with the
//! first complete reply. Both are cancellable through a caller-owned
//! [`CancellationToken`]: firing it closes the socket and fails the pending
//! wait with [`ClientError::StreamCancelled`] instead of hanging.
//!
//! Each session owns exactly one connection and sends exactly one outbound
//! message; a finished or failed session cannot be replayed.

use async_stream::stream;
use futures::{SinkExt, Stream, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::client::ClientError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Lifecycle of one streaming session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Connecting,
    Open,
    Streaming,
    Finished,
    Errored,
}

/// A decoded inbound agent message.
#[derive(Debug, Deserialize)]
struct AgentEnvelope {
    agent: AgentEvent,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "eventType")]
enum AgentEvent {
    #[serde(rename = "kDelta")]
    Delta { content: String },
    #[serde(rename = "kFinish")]
    Finish { content: String },
}

/// What the socket loop should do after one inbound message.
#[derive(Debug, PartialEq, Eq)]
enum Step {
    /// Forward this content to the consumer.
    Yield(String),
    /// Terminal event; forward the content first if present, then close.
    Finish(Option<String>),
    /// Nothing to forward.
    Ignore,
}

/// Delta-aggregation state machine for one streaming session.
///
/// Pure with respect to I/O: the socket loop feeds it decoded message text
/// and acts on the returned [`Step`]. The aggregate always equals the
/// concatenation, in arrival order, of the delta contents yielded so far.
#[derive(Debug)]
struct DeltaSession {
    state: SessionState,
    aggregate: String,
}

impl DeltaSession {
    fn new() -> Self {
        Self {
            state: SessionState::Connecting,
            aggregate: String::new(),
        }
    }

    /// The socket is established and the outbound message has been sent.
    fn opened(&mut self) {
        self.state = SessionState::Open;
    }

    fn on_message(&mut self, text: &str) -> Result<Step, ClientError> {
        if self.state == SessionState::Finished {
            return Ok(Step::Ignore);
        }
        if self.state == SessionState::Open {
            self.state = SessionState::Streaming;
        }

        let value: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(_) => {
                self.state = SessionState::Errored;
                return Err(ClientError::MalformedPayload(text.to_string()));
            }
        };

        // Valid JSON without the event discriminator is not forwarded.
        let Ok(envelope) = serde_json::from_value::<AgentEnvelope>(value) else {
            return Ok(Step::Ignore);
        };

        match envelope.agent {
            AgentEvent::Delta { content } => {
                self.aggregate.push_str(&content);
                Ok(Step::Yield(content))
            }
            AgentEvent::Finish { content } => {
                // Exact equality only: a finish event that repeats the
                // aggregated deltas produces no extra value.
                let extra = (content != self.aggregate).then_some(content);
                self.state = SessionState::Finished;
                Ok(Step::Finish(extra))
            }
        }
    }
}

/// Extract UTF-8 text from an inbound frame, if it carries any.
fn message_text(msg: WsMessage) -> Result<Option<String>, ClientError> {
    match msg {
        WsMessage::Text(text) => Ok(Some(text.as_str().to_owned())),
        WsMessage::Binary(bin) => String::from_utf8(bin.to_vec())
            .map(Some)
            .map_err(|e| ClientError::MalformedPayload(format!("binary frame is not UTF-8: {e}"))),
        _ => Ok(None),
    }
}

/// Connect to the agent, honoring an already-fired or racing abort signal.
async fn connect(url: &str, cancel: &CancellationToken) -> Result<WsStream, ClientError> {
    if cancel.is_cancelled() {
        return Err(ClientError::StreamCancelled);
    }
    let ws = tokio::select! {
        _ = cancel.cancelled() => return Err(ClientError::StreamCancelled),
        connected = connect_async(url) => connected?.0,
    };
    Ok(ws)
}

/// Open a socket, send one outbound message, and stream agent delta contents.
///
/// Yields each `kDelta` content in arrival order. On `kFinish`, content not
/// already covered by the aggregated deltas is yielded once as the final
/// value; either way the socket is closed and the stream ends. Unrecognized
/// messages are ignored. The finish event is the only clean end: a peer that
/// closes the connection before it fails the stream with
/// [`ClientError::Socket`]. Cancelling `cancel` closes the socket and fails
/// the pending wait with [`ClientError::StreamCancelled`]; after the finish
/// event cancellation has no observable effect.
pub async fn stream_deltas(
    url: &str,
    outbound: Value,
    cancel: CancellationToken,
) -> Result<impl Stream<Item = Result<String, ClientError>> + Send, ClientError> {
    let mut session = DeltaSession::new();
    let mut ws = connect(url, &cancel).await?;
    debug!(url, "agent stream session connected");

    let text = serde_json::to_string(&outbound)?;
    tokio::select! {
        _ = cancel.cancelled() => {
            let _ = ws.close(None).await;
            return Err(ClientError::StreamCancelled);
        }
        sent = ws.send(WsMessage::Text(text.into())) => sent?,
    }
    session.opened();

    Ok(stream! {
        loop {
            let inbound = tokio::select! {
                _ = cancel.cancelled() => {
                    let _ = ws.close(None).await;
                    debug!("agent stream session cancelled");
                    yield Err(ClientError::StreamCancelled);
                    return;
                }
                inbound = ws.next() => inbound,
            };

            let msg = match inbound {
                Some(Ok(msg)) => msg,
                Some(Err(e)) => {
                    yield Err(e.into());
                    return;
                }
                // Peer went away without a finish event.
                None => {
                    yield Err(ClientError::Socket(
                        "connection closed before finish".to_string(),
                    ));
                    return;
                }
            };

            let msg = match msg {
                WsMessage::Ping(payload) => {
                    if let Err(e) = ws.send(WsMessage::Pong(payload)).await {
                        yield Err(e.into());
                        return;
                    }
                    continue;
                }
                WsMessage::Close(_) => {
                    yield Err(ClientError::Socket(
                        "connection closed before finish".to_string(),
                    ));
                    return;
                }
                other => other,
            };

            let text = match message_text(msg) {
                Ok(Some(text)) => text,
                Ok(None) => continue,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };
            trace!(len = text.len(), "agent message received");

            match session.on_message(&text) {
                Ok(Step::Yield(content)) => yield Ok(content),
                Ok(Step::Finish(extra)) => {
                    if let Some(content) = extra {
                        yield Ok(content);
                    }
                    let _ = ws.close(None).await;
                    debug!("agent stream session finished");
                    return;
                }
                Ok(Step::Ignore) => {}
                Err(e) => {
                    let _ = ws.close(None).await;
                    yield Err(e);
                    return;
                }
            }
        }
    })
}

/// Open a socket, send one `{ "action": ... }` message, and resolve with the
/// first successfully parsed reply. The socket is closed on every exit path.
pub async fn request_once(
    url: &str,
    action: &str,
    payload: Value,
    cancel: CancellationToken,
) -> Result<Value, ClientError> {
    let mut ws = connect(url, &cancel).await?;
    debug!(url, action, "agent single-shot session connected");

    let mut outbound = json!({ "action": action });
    if let (Value::Object(out), Value::Object(extra)) = (&mut outbound, payload) {
        out.extend(extra);
    }
    let text = serde_json::to_string(&outbound)?;
    tokio::select! {
        _ = cancel.cancelled() => {
            let _ = ws.close(None).await;
            return Err(ClientError::StreamCancelled);
        }
        sent = ws.send(WsMessage::Text(text.into())) => sent?,
    }

    loop {
        let inbound = tokio::select! {
            _ = cancel.cancelled() => {
                let _ = ws.close(None).await;
                return Err(ClientError::StreamCancelled);
            }
            inbound = ws.next() => inbound,
        };

        let msg = match inbound {
            Some(Ok(msg)) => msg,
            Some(Err(e)) => return Err(e.into()),
            None => {
                return Err(ClientError::Socket(
                    "connection closed before a reply arrived".to_string(),
                ))
            }
        };

        match msg {
            WsMessage::Ping(payload) => {
                ws.send(WsMessage::Pong(payload)).await?;
            }
            WsMessage::Close(_) => {
                return Err(ClientError::Socket(
                    "connection closed before a reply arrived".to_string(),
                ));
            }
            other => {
                if let Some(text) = message_text(other)? {
                    let value: Value = serde_json::from_str(&text)
                        .map_err(|_| ClientError::MalformedPayload(text.clone()))?;
                    let _ = ws.close(None).await;
                    return Ok(value);
                }
            }
        }
    }
}
