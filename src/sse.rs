//! Server-Sent Events (SSE) stream processing.
//!
//! SSE format:
//! ```text
//! data: {"key": "value"}
//!
//! data: {"another": "event"}
//!
//! data: [DONE]
//! ```
//!
//! Only `data:` frames produce consumer-visible values. The `[DONE]` sentinel
//! ends the stream; `: ping` keepalives, comments and blank lines are
//! consumed silently.

use async_stream::stream;
use futures::{Stream, StreamExt};
use serde_json::Value;

use crate::client::ClientError;
use crate::http::error_for_status_text;
use crate::lines::lines;

/// Interpretation of a single SSE line.
#[derive(Debug, Clone, PartialEq)]
pub enum SseFrame {
    /// A `data:` frame carrying a JSON payload.
    Data(Value),
    /// The `data: [DONE]` sentinel; no further values follow.
    Done,
    /// Keepalives, comments, blank lines.
    Ignored,
}

/// Classify one SSE line.
///
/// `data:` frames are accepted with or without one space after the colon.
/// A frame that fails JSON parsing is fatal and carries the raw offending
/// text; a parsed payload carrying a non-null `error` field is fatal as
/// well (an explicit `"error": null` passes through as data).
pub fn interpret_sse_line(line: &str) -> Result<SseFrame, ClientError> {
    if line.starts_with("data: [DONE]") {
        return Ok(SseFrame::Done);
    }

    if let Some(rest) = line.strip_prefix("data:") {
        let json = rest.strip_prefix(' ').unwrap_or(rest);
        let value: Value = serde_json::from_str(json)
            .map_err(|_| ClientError::MalformedPayload(json.to_string()))?;
        if let Some(error) = value.get("error").filter(|error| !error.is_null()) {
            return Err(ClientError::Stream(error.to_string()));
        }
        return Ok(SseFrame::Data(value));
    }

    // ": ping" keepalives and anything else fall through here.
    Ok(SseFrame::Ignored)
}

/// Decode a raw byte-chunk stream as a sequence of SSE JSON payloads.
///
/// Ends at the `data: [DONE]` sentinel; once it is observed no further
/// values are yielded even if buffered text remains. A trailing buffered
/// line at end of input is interpreted with the same rules.
pub fn sse_stream<S, B>(chunks: S) -> impl Stream<Item = Result<Value, ClientError>> + Send
where
    S: Stream<Item = Result<B, ClientError>> + Send,
    B: AsRef<[u8]> + Send,
{
    stream! {
        for await line in lines(chunks) {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };
            match interpret_sse_line(&line) {
                Ok(SseFrame::Data(value)) => yield Ok(value),
                Ok(SseFrame::Done) => return,
                Ok(SseFrame::Ignored) => {}
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
        }
    }
}

/// Extension trait for `reqwest::Response` enabling SSE decoding.
pub trait SseResponseExt {
    /// Decode the response body as a stream of SSE JSON payloads.
    ///
    /// Fails immediately with [`ClientError::Transport`] carrying the raw
    /// error body when the status is non-success, without interpreting the
    /// body as frames.
    fn sse(self) -> impl Stream<Item = Result<Value, ClientError>> + Send;
}

impl SseResponseExt for reqwest::Response {
    fn sse(self) -> impl Stream<Item = Result<Value, ClientError>> + Send {
        stream! {
            let response = match error_for_status_text(self).await {
                Ok(response) => response,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };
            let bytes = response.bytes_stream().map(|chunk| chunk.map_err(ClientError::from));
            for await value in sse_stream(bytes) {
                yield value;
            }
        }
    }
}
