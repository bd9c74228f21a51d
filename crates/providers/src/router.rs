//! Provider selection — builds the configured backend from `[provider]`.

use std::sync::Arc;
use scrivener_config::ProviderConfig;
use scrivener_core::error::ProviderError;
use scrivener_core::provider::Provider;
use tracing::info;
use crate::anthropic::AnthropicProvider;
use crate::openai_compat::OpenAiCompatProvider;

/// Build the provider named in the configuration.
///
/// `anthropic` uses the native Messages API; every other name is treated as
/// an OpenAI-compatible endpoint. Local servers (ollama, vllm, llama.cpp) do
/// not need a key; hosted ones do. Names without a known endpoint need
/// `provider.api_url`.
pub fn build_from_config(config: &ProviderConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let name = config.name.trim().to_ascii_lowercase();
    let api_key = config.api_key.clone().unwrap_or_default();

    if api_key.is_empty() && !is_local(&name) {
        return Err(ProviderError::NotConfigured(format!(
            "provider '{name}' requires an API key (set SCRIVENER_API_KEY or provider.api_key)"
        )));
    }

    let provider: Arc<dyn Provider> = if name == "anthropic" {
        let mut p = AnthropicProvider::new(&api_key);
        if let Some(url) = &config.api_url {
            p = p.with_base_url(url);
        }
        Arc::new(p)
    } else {
        let base_url = match (&config.api_url, default_base_url(&name)) {
            (Some(url), _) => url.as_str(),
            (None, Some(url)) => url,
            (None, None) => {
                return Err(ProviderError::NotConfigured(format!(
                    "unknown provider '{name}' needs provider.api_url"
                )));
            }
        };
        Arc::new(OpenAiCompatProvider::new(&name, base_url, &api_key))
    };

    info!(provider = %provider.name(), "Text generation provider ready");
    Ok(provider)
}

fn is_local(provider_name: &str) -> bool {
    matches!(provider_name, "ollama" | "vllm" | "llamacpp" | "llama.cpp")
}

/// Default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> Option<&'static str> {
    let url = match provider_name {
        "openrouter" => "https://openrouter.ai/api/v1",
        "openai" => "https://api.openai.com/v1",
        "ollama" => "http://localhost:11434/v1",
        "deepseek" => "https://api.deepseek.com/v1",
        "groq" => "https://api.groq.com/openai/v1",
        "together" => "https://api.together.xyz/v1",
        "vllm" => "http://localhost:8000/v1",
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1",
        _ => return None,
    };
    Some(url)
}
