//! Generic options structures for model and transport configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Default base URL of a local inference server.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Environment variable consulted by [`HttpTransport::from_env`].
pub const HOST_ENV_VAR: &str = "OLLAMA_HOST";

/// Generic model options containing common model behavior parameters
/// and provider-specific model configuration.
///
/// # Type Parameters
/// - `T`: Provider-specific model options type
///
/// # Example
/// ```rust
/// use ollama_stream::options::{ModelOptions, OllamaModel};
///
/// let options = ModelOptions::new(OllamaModel::default())
///     .with_model("mistral".to_string())
///     .with_temperature(0.7)
///     .with_max_tokens(128);
///
/// assert_eq!(options.model.as_deref(), Some("mistral"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ModelOptions<T> {
    /// Model identifier (e.g., "llama2", "mistral")
    pub model: Option<String>,

    /// System instructions passed to the model
    pub instructions: Option<String>,

    /// Temperature for sampling
    pub temperature: Option<f32>,

    /// Top-p (nucleus) sampling parameter
    pub top_p: Option<f32>,

    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,

    /// Provider-specific model options
    pub provider: T,
}

/// Generic transport options containing truly generic transport fields
/// and provider-specific transport configuration.
///
/// The timeout bounds the whole exchange, including reading a streamed body.
#[derive(Debug, Clone)]
pub struct TransportOptions<T> {
    /// Request timeout (applies to all transports)
    pub timeout: Option<Duration>,

    /// Provider-specific transport options
    pub provider: T,
}

/// HTTP-specific transport options.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    /// Base URL for API endpoints, `DEFAULT_BASE_URL` when unset
    pub base_url: Option<String>,

    /// HTTP proxy URL
    pub proxy: Option<String>,

    /// Additional HTTP headers to include in requests
    pub extra_headers: Option<HashMap<String, String>>,
}

impl HttpTransport {
    /// Create new HTTP transport options pointed at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
            proxy: None,
            extra_headers: None,
        }
    }

    /// Read the server address from `OLLAMA_HOST`.
    ///
    /// Accepts either a full URL or a bare `host:port`; falls back to the
    /// default base URL when the variable is unset or empty.
    pub fn from_env() -> Self {
        match std::env::var(HOST_ENV_VAR) {
            Ok(host) if !host.trim().is_empty() => Self::new(normalize_host(&host)),
            _ => Self::default(),
        }
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// Set the proxy URL.
    pub fn with_proxy(mut self, proxy: String) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Set extra headers.
    pub fn with_extra_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.extra_headers = Some(headers);
        self
    }

    /// Add a single extra header.
    pub fn with_header(mut self, key: String, value: String) -> Self {
        self.extra_headers
            .get_or_insert_with(HashMap::new)
            .insert(key, value);
        self
    }

    /// Resolve `path` against the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        let base = self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        format!(
            "{}/{}",
            base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.trim();
    if host.contains("://") {
        host.to_string()
    } else {
        format!("http://{host}")
    }
}

/// Ollama-specific model options.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OllamaModel {
    /// Sample only from the `top_k` most likely tokens
    pub top_k: Option<u32>,

    /// Fixed seed for reproducible output
    pub seed: Option<i64>,

    /// How long the server keeps the model loaded, e.g. `"5m"` or `"0"`
    pub keep_alive: Option<String>,
}

impl OllamaModel {
    pub fn with_top_k(mut self, top_k: u32) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn with_seed(mut self, seed: i64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_keep_alive(mut self, keep_alive: String) -> Self {
        self.keep_alive = Some(keep_alive);
        self
    }
}

impl<T> ModelOptions<T> {
    /// Create new model options with provider-specific configuration.
    pub fn new(provider: T) -> Self {
        Self {
            model: None,
            instructions: None,
            temperature: None,
            top_p: None,
            max_tokens: None,
            provider,
        }
    }

    /// Set the model identifier.
    pub fn with_model(mut self, model: String) -> Self {
        self.model = Some(model);
        self
    }

    /// Set the system instructions.
    pub fn with_instructions(mut self, instructions: String) -> Self {
        self.instructions = Some(instructions);
        self
    }

    /// Set the temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set top-p sampling parameter.
    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    /// Set maximum tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
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
