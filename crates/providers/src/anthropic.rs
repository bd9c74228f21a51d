//! Anthropic native provider implementation.
//!
//! Uses Anthropic's Messages API directly (not an OpenAI-compatible proxy).
//!
//! - `x-api-key` header authentication (not Bearer)
//! - `anthropic-version` header
//! - Response body returned as-is (text arrives in `content` blocks)

use async_trait::async_trait;
use scrivener_core::error::ProviderError;
use scrivener_core::provider::{GenerationRequest, Provider};
use scrivener_core::stage::OutputFormat;
use tracing::debug;

use crate::http;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Prepended to the prompt for JSON stages; the Messages API has no JSON mode.
const JSON_SYSTEM_PROMPT: &str = "Respond with a single valid JSON document and nothing else.";

/// Anthropic native Messages API provider.
pub struct AnthropicProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            name: "anthropic".into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            client: http::client(300),
        }
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn request_body(request: &GenerationRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": [{ "role": "user", "content": request.prompt }],
            "max_tokens": request.max_tokens,
            "temperature": request.temperature.min(1.0),
        });

        if request.output_format == OutputFormat::Json {
            body["system"] = serde_json::json!(JSON_SYSTEM_PROMPT);
        }

        body
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> std::result::Result<serde_json::Value, ProviderError> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = Self::request_body(&request);

        debug!(provider = "anthropic", model = %request.model, "Sending messages request");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(http::send_error)?;

        http::json_body(&self.name, response).await
    }
}
