//! Newline-delimited JSON stream processing.
//!
//! Each complete line is parsed independently as a JSON value and forwarded
//! as-is. A parse failure fails the whole sequence; there is no per-line
//! recovery.

use async_stream::try_stream;
use futures::{Stream, StreamExt};
use serde_json::Value;

use crate::client::ClientError;
use crate::http::error_for_status_text;
use crate::lines::lines;

/// Decode a raw byte-chunk stream as newline-delimited JSON values.
pub fn json_lines_stream<S, B>(chunks: S) -> impl Stream<Item = Result<Value, ClientError>> + Send
where
    S: Stream<Item = Result<B, ClientError>> + Send,
    B: AsRef<[u8]> + Send,
{
    try_stream! {
        for await line in lines(chunks) {
            let line = line?;
            let value: Value = serde_json::from_str(&line)
                .map_err(|_| ClientError::MalformedPayload(line.clone()))?;
            yield value;
        }
    }
}

/// Extension trait for `reqwest::Response` enabling JSON-lines decoding.
pub trait JsonLinesResponseExt {
    /// Decode the response body as newline-delimited JSON values.
    ///
    /// Fails immediately with [`ClientError::Transport`] carrying the raw
    /// error body when the status is non-success.
    fn json_lines(self) -> impl Stream<Item = Result<Value, ClientError>> + Send;
}

impl JsonLinesResponseExt for reqwest::Response {
    fn json_lines(self) -> impl Stream<Item = Result<Value, ClientError>> + Send {
        async_stream::stream! {
            let response = match error_for_status_text(self).await {
                Ok(response) => response,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };
            let bytes = response.bytes_stream().map(|chunk| chunk.map_err(ClientError::from));
            for await value in json_lines_stream(bytes) {
                yield value;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn collect(parts: Vec<&'static str>) -> Vec<Result<Value, ClientError>> {
        json_lines_stream(futures::stream::iter(
            parts
                .into_iter()
                .map(|part| Ok::<_, ClientError>(part.as_bytes())),
        ))
        .collect()
        .await
    }

    #[tokio::test]
    async fn test_each_line_is_an_independent_value() {
        let results = collect(vec!["{\"a\":1}\n{\"b\"", ":2}\n"]).await;
        let values: Vec<Value> = results.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(values, vec![json!({"a": 1}), json!({"b": 2})]);
    }

    #[tokio::test]
    async fn test_trailing_line_without_newline_is_parsed() {
        let results = collect(vec!["{\"a\":1}\n{\"b\":2}"]).await;
        let values: Vec<Value> = results.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(values, vec![json!({"a": 1}), json!({"b": 2})]);
    }

    #[tokio::test]
    async fn test_parse_failure_is_fatal() {
        let results = collect(vec!["{\"a\":1}\nnot json\n{\"b\":2}\n"]).await;
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        match &results[1] {
            Err(ClientError::MalformedPayload(raw)) => assert_eq!(raw, "not json"),
            other => panic!("expected MalformedPayload, got {other:?}"),
        }
    }

    async fn serve_http_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut tcp, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = tcp.read(&mut request).await;
            let response = format!(
                "{status_line}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            tcp.write_all(response.as_bytes()).await.unwrap();
        });
        format!("http://{addr}/")
    }

    #[tokio::test]
    async fn test_response_ext_decodes_json_lines_body() {
        let url = serve_http_once("HTTP/1.1 200 OK", "{\"a\":1}\n{\"b\":2}\n").await;
        let response = reqwest::get(&url).await.unwrap();
        let values: Vec<Value> = response
            .json_lines()
            .map(|value| value.unwrap())
            .collect()
            .await;
        assert_eq!(values, vec![json!({"a": 1}), json!({"b": 2})]);
    }

    #[tokio::test]
    async fn test_response_ext_surfaces_transport_error_with_raw_body() {
        let url = serve_http_once("HTTP/1.1 503 Service Unavailable", "try later").await;
        let response = reqwest::get(&url).await.unwrap();
        let results: Vec<_> = response.json_lines().collect().await;
        assert_eq!(results.len(), 1);
        match &results[0] {
            Err(ClientError::Transport(text)) => assert!(text.contains("try later")),
            other => panic!("expected Transport error, got {other:?}"),
        }
    }
}
