//! # wirestream - streaming wire transports for LLM clients
//!
//! A small, pragmatic Rust library that normalizes three wire-level
//! streaming transports into one uniform lazy sequence of decoded values:
//!
//! - chunked HTTP bodies framed as Server-Sent Events ([`sse`])
//! - chunked HTTP bodies framed as newline-delimited JSON ([`ndjson`])
//! - a bidirectional WebSocket protocol carrying incremental delta
//!   events ([`ws`])
//!
//! ## Features
//! - Async-first, tokio compatible
//! - Incremental UTF-8 decoding and line framing across chunk boundaries
//! - Cooperative cancellation via `tokio_util::sync::CancellationToken`
//! - Provider-agnostic trait-based client design
//!
//! ## Consuming a stream
//!
//! All three transports produce a lazy, finite, forward-only sequence the
//! caller pulls value-by-value; a failed or exhausted sequence cannot be
//! replayed. Errors surface in the sequence itself and values already
//! yielded are never revoked.
//!
//! ## Example
//! ```no_run
//! use futures::StreamExt;
//! use wirestream::client::{Client, StreamingClient};
//! use wirestream::model::{Message, Role};
//! use wirestream::options::{AgentModel, ModelOptions, TransportOptions, WsTransport};
//! use wirestream::providers::AgentClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = <AgentClient as Client>::new(
//!         ModelOptions::new(AgentModel {}),
//!         TransportOptions::new(WsTransport::new("ws://localhost:8765")),
//!     );
//!
//!     let messages = vec![Message::text(Role::User, "Hello!")];
//!     let stream = client.chat_stream(messages).await?;
//!     futures::pin_mut!(stream);
//!     while let Some(chunk) = stream.next().await {
//!         println!("{:?}", chunk?);
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod http;
pub mod lines;
pub mod model;
pub mod ndjson;
pub mod options;
pub mod providers;
pub mod sse;
pub mod ws;

// Re-exports for convenience
pub use client::{Client, ClientError, StreamingClient};
pub use model::{Message, Response, StreamChunk};
