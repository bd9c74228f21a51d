//! HTTP plumbing shared by the provider implementations.

use scrivener_core::ProviderError;
use tracing::warn;

/// Build the HTTP client. The timeout is the only cancellation the pipeline has.
pub(crate) fn client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Map a reqwest send failure onto the provider error taxonomy.
pub(crate) fn send_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else {
        ProviderError::Network(e.to_string())
    }
}

/// Turn a non-200 response into an error, or hand back the JSON body.
pub(crate) async fn json_body(
    provider: &str,
    response: reqwest::Response,
) -> Result<serde_json::Value, ProviderError> {
    let status = response.status().as_u16();

    if status == 429 {
        let retry_after_secs = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);
        return Err(ProviderError::RateLimited { retry_after_secs });
    }

    if status == 401 || status == 403 {
        return Err(ProviderError::AuthenticationFailed(format!(
            "{provider}: invalid API key or insufficient permissions"
        )));
    }

    if status != 200 {
        let error_body = response.text().await.unwrap_or_default();
        warn!(provider, status, body = %error_body, "Provider returned error");
        return Err(ProviderError::ApiError {
            status_code: status,
            message: error_body,
        });
    }

    response.json().await.map_err(|e| ProviderError::ApiError {
        status_code: 200,
        message: format!("Failed to read response body: {e}"),
    })
}
