//! Generic options structures for model and transport configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Generic model options containing common model behavior parameters
/// and provider-specific model configuration.
///
/// # Type Parameters
/// - `T`: Provider-specific model options type
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ModelOptions<T> {
    /// Model identifier (e.g., "gpt-4o", "claude-3-opus")
    pub model: Option<String>,

    /// System instructions passed to the model
    pub instructions: Option<String>,

    /// Temperature for sampling (0.0 - 2.0)
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,

    /// Provider-specific model options
    pub provider: T,
}

impl<T> ModelOptions<T> {
    /// Create new model options with provider-specific configuration.
    pub fn new(provider: T) -> Self {
        Self {
            model: None,
            instructions: None,
            temperature: None,
            max_tokens: None,
            provider,
        }
    }

    /// Set the model identifier.
    pub fn with_model(mut self, model: String) -> Self {
        self.model = Some(model);
        self
    }

    /// Set the temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set maximum tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Generic transport options containing truly generic transport fields
/// and provider-specific transport configuration.
///
/// # Type Parameters
/// - `T`: Provider-specific transport options type
#[derive(Debug, Clone)]
pub struct TransportOptions<T> {
    /// Request timeout (applies to all transports)
    pub timeout: Option<Duration>,

    /// Provider-specific transport options
    pub provider: T,
}

impl<T> TransportOptions<T> {
    /// Create new transport options with provider-specific configuration.
    pub fn new(provider: T) -> Self {
        Self {
            timeout: None,
            provider,
        }
    }

    /// Set the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// WebSocket transport options for the local agent daemon.
/// Used as the provider field in `TransportOptions<WsTransport>`.
#[derive(Debug, Clone, Default)]
pub struct WsTransport {
    /// Socket URL of the agent (defaults to `ws://localhost:8765`)
    pub url: Option<String>,

    /// Base URL of the agent's HTTP embedding endpoint
    /// (defaults to `http://127.0.0.1:1234`)
    pub http_base_url: Option<String>,
}

impl WsTransport {
    /// Create WebSocket transport options pointing at the given socket URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            http_base_url: None,
        }
    }

    /// Set the HTTP base URL used for embedding requests.
    pub fn with_http_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.http_base_url = Some(base_url.into());
        self
    }
}

/// Agent-specific model options. The agent daemon picks the backing model
/// itself, so there is nothing to configure yet.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AgentModel {}
