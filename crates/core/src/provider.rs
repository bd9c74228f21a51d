//! Provider trait — the abstraction over text-generation backends.
//!
//! A Provider takes a single prompt and returns the backend's raw JSON
//! response. The response shape is deliberately left untyped here: callers
//! resolve it into text themselves, because backends disagree on envelopes.
//!
//! Implementations: OpenAI-compatible, Anthropic.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::ProviderError;
use crate::stage::OutputFormat;

/// One generation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The model to use (e.g., "gpt-4o-mini", "claude-sonnet-4")
    pub model: String,

    /// The fully rendered prompt
    pub prompt: String,

    /// Temperature (0.0 = deterministic, 2.0 = most random)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Whether the backend should be asked for JSON output
    #[serde(default)]
    pub output_format: OutputFormat,
}

fn default_temperature() -> f32 {
    0.3
}

/// The core Provider trait.
///
/// The pipeline calls `generate()` once per enabled stage per chunk without
/// knowing which backend is in use. Retries and timeouts belong to the
/// implementation's transport, never to the caller.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openai", "anthropic").
    fn name(&self) -> &str;

    /// Send a prompt and get the raw response body back.
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> std::result::Result<serde_json::Value, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_defaults_from_json() {
        let req: GenerationRequest = serde_json::from_value(serde_json::json!({
            "model": "gpt-4o-mini",
            "prompt": "Fix the typos.",
            "max_tokens": 512,
        }))
        .unwrap();
        assert!((req.temperature - 0.3).abs() < f32::EPSILON);
        assert_eq!(req.output_format, OutputFormat::Text);
    }

    #[test]
    fn request_serialization() {
        let req = GenerationRequest {
            model: "gpt-4o".into(),
            prompt: "hello".into(),
            temperature: 0.5,
            max_tokens: 100,
            output_format: OutputFormat::Json,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"output_format\":\"json\""));
    }
}
