//! HTTP client utilities shared by the HTTP-based transports.

use reqwest::Client;

use crate::client::ClientError;
use crate::options::TransportOptions;

/// Build a configured HTTP client from transport options.
///
/// Applies the generic transport settings (currently the timeout).
pub fn build_http_client<T>(
    transport_options: &TransportOptions<T>,
) -> Result<Client, ClientError> {
    let mut builder = Client::builder();

    if let Some(timeout) = transport_options.timeout {
        builder = builder.timeout(timeout);
    }

    Ok(builder.build()?)
}

/// Fail fast on a non-success status, surfacing the raw error body text.
///
/// The body is read as plain text and never interpreted as frames.
pub async fn error_for_status_text(
    response: reqwest::Response,
) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ClientError::Transport(format!("HTTP {status}: {body}")))
}
