//! OpenAI-compatible provider implementation.
//!
//! Works with: OpenAI, OpenRouter, Ollama, vLLM, llama.cpp, Together AI,
//! and any endpoint exposing `/v1/chat/completions`.
//!
//! The prompt is sent as a single user message. The response body is handed
//! back untouched; shape resolution happens in the pipeline.

use async_trait::async_trait;
use scrivener_core::error::ProviderError;
use scrivener_core::provider::{GenerationRequest, Provider};
use scrivener_core::stage::OutputFormat;
use tracing::debug;

use crate::http;

/// An OpenAI-compatible text-generation provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: http::client(120),
        }
    }

    /// Build the chat-completions request body.
    fn request_body(request: &GenerationRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": [{ "role": "user", "content": request.prompt }],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "stream": false,
        });

        if request.output_format == OutputFormat::Json {
            body["response_format"] = serde_json::json!({ "type": "json_object" });
        }

        body
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> std::result::Result<serde_json::Value, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = Self::request_body(&request);

        debug!(
            provider = %self.name,
            model = %request.model,
            prompt_chars = request.prompt.chars().count(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(http::send_error)?;

        http::json_body(&self.name, response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(format: OutputFormat) -> GenerationRequest {
        GenerationRequest {
            model: "gpt-4o-mini".into(),
            prompt: "Fix this.".into(),
            temperature: 0.2,
            max_tokens: 256,
            output_format: format,
        }
    }

    #[test]
    fn trailing_slash_trimmed() {
        let provider = OpenAiCompatProvider::new("vllm", "http://localhost:8000/v1/", "");
        assert_eq!(provider.base_url, "http://localhost:8000/v1");
    }

    #[test]
    fn body_sends_prompt_as_single_user_message() {
        let body = OpenAiCompatProvider::request_body(&request(OutputFormat::Text));
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "Fix this.");
        assert_eq!(body["max_tokens"], 256);
        assert!(body.get("response_format").is_none());
    }

    #[test]
    fn json_stage_requests_json_object() {
        let body = OpenAiCompatProvider::request_body(&request(OutputFormat::Json));
        assert_eq!(body["response_format"]["type"], "json_object");
    }
}
